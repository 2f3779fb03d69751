//! Referential integrity of index links.
//!
//! Parsing never resolves indices. These checks run on a finished graph and
//! report every link that does not resolve, with the path of the record that
//! holds it.

use nalgebra::Vector3;

use crate::bound::{BoundComposite, BoundGeometryBvh, BoundItem};
use crate::error::IntegrityError;
use crate::fragment::{Fragment, GroupItem, Lod, NO_PARENT};

/// Groups of a LOD arranged by their parent links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupForest {
    /// Groups without a parent, in list order.
    pub roots: Vec<usize>,
    /// `children[i]` lists the groups whose parent is group `i`, in list order.
    pub children: Vec<Vec<usize>>,
}

impl GroupForest {
    /// Depth-first walk from each root, yielding `(group, depth)`.
    pub fn walk(&self) -> Vec<(usize, usize)> {
        let mut order = Vec::with_capacity(self.children.len());
        let mut stack: Vec<(usize, usize)> = self.roots.iter().rev().map(|&r| (r, 0)).collect();
        while let Some((group, depth)) = stack.pop() {
            order.push((group, depth));
            for &child in self.children[group].iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        order
    }
}

impl Lod {
    /// Resolve `parent_index` links into a forest.
    ///
    /// Fails on the first group whose parent is itself, is out of range, or
    /// sits on a cycle.
    pub fn group_forest(&self) -> Result<GroupForest, IntegrityError> {
        let (forest, mut errors) = self.link_groups();
        if errors.is_empty() {
            Ok(forest)
        } else {
            Err(errors.swap_remove(0))
        }
    }

    /// Group at `index`.
    pub fn group(&self, index: u8) -> Result<&GroupItem, IntegrityError> {
        self.groups.get(usize::from(index)).ok_or_else(|| {
            IntegrityError::new(
                "Groups",
                format!("group index {index} out of range ({} groups)", self.groups.len()),
            )
        })
    }

    /// Every unresolved group parent and child group index.
    pub fn validate(&self) -> Vec<IntegrityError> {
        let (_, mut errors) = self.link_groups();
        for (i, child) in self.children.iter().enumerate() {
            if let Err(err) = self.group(child.group_index) {
                errors.push(IntegrityError::new(
                    format!("Children/Item[{i}]/GroupIndex"),
                    err.message,
                ));
            }
        }
        errors
    }

    fn link_groups(&self) -> (GroupForest, Vec<IntegrityError>) {
        let count = self.groups.len();
        let mut forest = GroupForest {
            roots: Vec::new(),
            children: vec![Vec::new(); count],
        };
        let mut errors = Vec::new();
        let parent_path = |i: usize| format!("Groups/Item[{i}]/ParentIndex");

        for (i, group) in self.groups.iter().enumerate() {
            let parent = usize::from(group.parent_index);
            if group.parent_index == NO_PARENT {
                forest.roots.push(i);
            } else if parent == i {
                errors.push(IntegrityError::new(parent_path(i), "group is its own parent"));
            } else if parent >= count {
                errors.push(IntegrityError::new(
                    parent_path(i),
                    format!("parent index {parent} out of range ({count} groups)"),
                ));
            } else {
                forest.children[parent].push(i);
            }
        }

        // Every group with a valid parent chain is reachable from a root.
        let mut reached = vec![false; count];
        for (group, _) in forest.walk() {
            reached[group] = true;
        }
        for (i, group) in self.groups.iter().enumerate() {
            let parent = usize::from(group.parent_index);
            if !reached[i] && group.parent_index != NO_PARENT && parent != i && parent < count {
                errors.push(IntegrityError::new(
                    parent_path(i),
                    format!("parent chain through group {parent} never reaches a root"),
                ));
            }
        }

        (forest, errors)
    }
}

impl BoundGeometryBvh {
    /// Vertex at `index`.
    pub fn vertex(&self, index: u32) -> Result<&Vector3<f32>, IntegrityError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.vertices.get(i))
            .ok_or_else(|| {
                IntegrityError::new(
                    "Vertices",
                    format!("vertex index {index} out of range ({} vertices)", self.vertices.len()),
                )
            })
    }

    /// Every polygon vertex or material index that does not resolve.
    pub fn validate(&self) -> Vec<IntegrityError> {
        let mut errors = Vec::new();
        for (i, polygon) in self.polygons.iter().enumerate() {
            let path = format!("Polygons/{}[{i}]", polygon.tag());
            for index in polygon.vertex_indices() {
                if let Err(err) = self.vertex(index) {
                    errors.push(IntegrityError::new(path.clone(), err.message));
                }
            }
            let material = usize::from(polygon.material_index());
            if material >= self.materials.len() {
                errors.push(IntegrityError::new(
                    path.clone(),
                    format!(
                        "material index {material} out of range ({} materials)",
                        self.materials.len()
                    ),
                ));
            }
        }
        errors
    }
}

impl BoundComposite {
    /// Integrity errors of every geometry child, recursing into nested
    /// composites. Paths are relative to this composite.
    pub fn validate(&self) -> Vec<IntegrityError> {
        let mut errors = Vec::new();
        for (i, child) in self.children.iter().enumerate() {
            let prefix = format!("Children/Item[{i}]");
            let nested = match child {
                BoundItem::Composite(composite) => composite.validate(),
                other => other.geometry().map(BoundGeometryBvh::validate).unwrap_or_default(),
            };
            errors.extend(prefixed(&prefix, nested));
        }
        errors
    }
}

impl Fragment {
    /// Integrity errors of every LOD: group links, child group indices and
    /// archetype bounds. Paths start at the document root.
    pub fn validate(&self) -> Vec<IntegrityError> {
        let mut errors = Vec::new();
        for (tag, lod) in self.lods() {
            let prefix = format!("Fragment/Physics/{tag}");
            errors.extend(prefixed(&prefix, lod.validate()));
            errors.extend(prefixed(
                &format!("{prefix}/Archetype/Bounds"),
                lod.archetype.bounds.validate(),
            ));
        }
        errors
    }
}

fn prefixed(prefix: &str, errors: Vec<IntegrityError>) -> impl Iterator<Item = IntegrityError> + '_ {
    errors
        .into_iter()
        .map(move |e| IntegrityError::new(format!("{prefix}/{}", e.path), e.message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bound::{MaterialItem, Polygon, PolygonBox, PolygonTriangle};
    use crate::fragment::{ChildItem, Physics};

    fn lod(parents: &[u8]) -> Lod {
        Lod {
            groups: parents
                .iter()
                .map(|&parent_index| GroupItem {
                    parent_index,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parent_chain_resolves() {
        let forest = lod(&[NO_PARENT, 0, 1]).group_forest().unwrap();
        assert_eq!(forest.roots, [0]);
        assert_eq!(forest.children[0], [1]);
        assert_eq!(forest.children[1], [2]);
        assert_eq!(forest.walk(), [(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn test_forward_parent_is_allowed() {
        let forest = lod(&[2, NO_PARENT, 1]).group_forest().unwrap();
        assert_eq!(forest.roots, [1]);
        assert_eq!(forest.walk(), [(1, 0), (2, 1), (0, 2)]);
    }

    #[test]
    fn test_self_reference() {
        let err = lod(&[NO_PARENT, 1]).group_forest().unwrap_err();
        assert_eq!(err.path, "Groups/Item[1]/ParentIndex");
    }

    #[test]
    fn test_out_of_range_parent() {
        let err = lod(&[NO_PARENT, 7]).group_forest().unwrap_err();
        assert!(err.message.contains("out of range"));
    }

    #[test]
    fn test_cycle() {
        let errors = lod(&[NO_PARENT, 2, 1]).validate();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.contains("never reaches a root"));
    }

    #[test]
    fn test_child_group_index() {
        let mut lod = lod(&[NO_PARENT]);
        lod.children = vec![
            ChildItem::default(),
            ChildItem {
                group_index: 4,
                ..Default::default()
            },
        ];
        let errors = lod.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "Children/Item[1]/GroupIndex");
    }

    fn geometry() -> BoundGeometryBvh {
        BoundGeometryBvh {
            materials: vec![MaterialItem::default()],
            vertices: vec![Vector3::zeros(); 3],
            polygons: vec![
                Polygon::Triangle(PolygonTriangle {
                    v1: 0,
                    v2: 1,
                    v3: 2,
                    ..Default::default()
                }),
                Polygon::Box(PolygonBox {
                    material_index: 1,
                    ..Default::default()
                }),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_polygon_indices() {
        let errors = geometry().validate();
        // Box v4 = 3 is past the end and material 1 does not exist.
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.path == "Polygons/Box[1]"));
        assert!(geometry().vertex(2).is_ok());
        assert!(geometry().vertex(3).is_err());
    }

    #[test]
    fn test_fragment_paths() {
        let mut lod = lod(&[NO_PARENT, 1]);
        lod.archetype.bounds = BoundComposite {
            children: vec![BoundItem::GeometryBvh(geometry())],
            ..Default::default()
        };
        let fragment = Fragment {
            physics: Physics {
                lod2: Some(lod),
                ..Default::default()
            },
            ..Default::default()
        };

        let paths: Vec<_> = fragment.validate().into_iter().map(|e| e.path).collect();
        assert_eq!(
            paths,
            [
                "Fragment/Physics/LOD2/Groups/Item[1]/ParentIndex",
                "Fragment/Physics/LOD2/Archetype/Bounds/Children/Item[0]/Polygons/Box[1]",
                "Fragment/Physics/LOD2/Archetype/Bounds/Children/Item[0]/Polygons/Box[1]",
            ]
        );
    }
}
