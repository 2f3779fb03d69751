//! Homogeneous lists of child elements.
//!
//! Polymorphic lists, where each item picks its own decoder, live next to the
//! schemas that own their dispatch tables (see `bound.rs`).

use std::marker::PhantomData;

use crate::element::ReadContext;
use crate::property::Codec;
use crate::xml::Element;

/// Every child of the list element decoded with `C`.
///
/// Items are written under `C::ITEM_TAG`, which is `Item` unless the item
/// record names its own tag.
pub struct ListProperty<C>(PhantomData<C>);

impl<C: Codec> Codec for ListProperty<C> {
    type Value = Vec<C::Value>;

    fn read(element: &Element, ctx: &mut ReadContext) -> Option<Vec<C::Value>> {
        let items = element
            .children
            .iter()
            .enumerate()
            .filter_map(|(i, child)| {
                ctx.scoped(format!("{}[{i}]", child.name), child.line, |ctx| {
                    C::read(child, ctx)
                })
            })
            .collect();
        Some(items)
    }

    fn write(value: &Vec<C::Value>, tag: &str) -> Option<Element> {
        let mut element = Element::new(tag);
        for item in value {
            if let Some(child) = C::write(item, C::ITEM_TAG) {
                element.push(child);
            }
        }
        Some(element)
    }
}

/// Children kept verbatim, for blocks owned by an external schema.
pub struct RawListProperty;

impl Codec for RawListProperty {
    type Value = Vec<Element>;

    fn read(element: &Element, _ctx: &mut ReadContext) -> Option<Vec<Element>> {
        Some(element.children.clone())
    }

    fn write(value: &Vec<Element>, tag: &str) -> Option<Element> {
        let mut element = Element::new(tag);
        element.children = value.clone();
        Some(element)
    }
}
