//! Hover highlight
//!
//! Each interactable prop eases toward an enlarged scale while hovered and
//! back to its original scale otherwise. The ease is a fixed fraction of the
//! remaining distance per frame, so it converges exponentially and never
//! overshoots.

use std::collections::HashMap;

use cgmath::{ElementWise, Matrix4, Vector3};

use crate::assets::bundle::{InteractableProp, PropId};
use crate::config::HighlightSettings;

#[derive(Clone, Copy, Debug)]
struct PropScale {
    original: Vector3<f32>,
    current: Vector3<f32>,
    pivot: Vector3<f32>,
}

pub struct HighlightAnimator {
    settings: HighlightSettings,
    props: HashMap<PropId, PropScale>,
}

impl HighlightAnimator {
    pub fn new(settings: HighlightSettings) -> Self {
        Self {
            settings,
            props: HashMap::new(),
        }
    }

    /// Starts animating a new prop set, forgetting any previous one
    pub fn track<'a>(&mut self, props: impl IntoIterator<Item = &'a InteractableProp>) {
        self.props = props
            .into_iter()
            .map(|prop| {
                (
                    prop.id,
                    PropScale {
                        original: prop.original_scale,
                        current: prop.original_scale,
                        pivot: prop.pivot,
                    },
                )
            })
            .collect();
    }

    pub fn clear(&mut self) {
        self.props.clear();
    }

    /// Advances every tracked prop one frame toward its target scale
    pub fn update(&mut self, hovered: Option<PropId>) {
        let HighlightSettings {
            hover_scale,
            lerp_factor,
        } = self.settings;

        for (id, prop) in self.props.iter_mut() {
            let target = if hovered == Some(*id) {
                prop.original * hover_scale
            } else {
                prop.original
            };
            prop.current += (target - prop.current) * lerp_factor;
        }
    }

    pub fn current_scale(&self, id: PropId) -> Option<Vector3<f32>> {
        self.props.get(&id).map(|prop| prop.current)
    }

    /// Model transform scaling the prop about its pivot
    pub fn transform_for(&self, id: PropId) -> Option<Matrix4<f32>> {
        self.props.get(&id).map(|prop| {
            let ratio = prop.current.div_element_wise(prop.original);
            Matrix4::from_translation(prop.pivot)
                * Matrix4::from_nonuniform_scale(ratio.x, ratio.y, ratio.z)
                * Matrix4::from_translation(-prop.pivot)
        })
    }

    pub fn tracked(&self) -> usize {
        self.props.len()
    }
}

impl Default for HighlightAnimator {
    fn default() -> Self {
        Self::new(HighlightSettings::default())
    }
}
