//! Scope (C4): a stack of string -> value frames for the DSL executor.
//!
//! `define` fails if the name already exists in the *current* frame; `set`
//! is upsert; `get` walks parent frames. `child()` returns a fresh scope
//! seeded by cloning the current frame chain — never a shared mutable
//! reference, per spec.md §9 ("implement as a vector of frames; `child()`
//! returns a clone of the current index, never shared mutable state").

use crate::error::{CoreError, CoreResult};
use crate::hdc::Hv;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

type Frame = HashMap<String, Hv>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scope {
    frames: Vec<Frame>,
}

impl Scope {
    #[must_use]
    pub fn new() -> Self {
        Scope {
            frames: vec![Frame::new()],
        }
    }

    pub fn push_frame(&mut self) {
        self.frames.push(Frame::new());
    }

    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Defines `name` in the current (innermost) frame. Fails if already
    /// present in that frame (shadowing a parent frame's binding is fine).
    pub fn define(&mut self, name: &str, value: Hv) -> CoreResult<()> {
        let current = self.frames.last_mut().expect("scope always has a frame");
        if current.contains_key(name) {
            return Err(CoreError::NameAlreadyDefined(name.to_string()));
        }
        current.insert(name.to_string(), value);
        Ok(())
    }

    /// Upsert into the current frame.
    pub fn set(&mut self, name: &str, value: Hv) {
        let current = self.frames.last_mut().expect("scope always has a frame");
        current.insert(name.to_string(), value);
    }

    /// Walks from innermost to outermost frame.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Hv> {
        for frame in self.frames.iter().rev() {
            if let Some(v) = frame.get(name) {
                return Some(v);
            }
        }
        None
    }

    pub fn get_or_err(&self, name: &str) -> CoreResult<&Hv> {
        self.get(name)
            .ok_or_else(|| CoreError::UnboundReference(name.to_string()))
    }

    /// A fresh child scope: the current frame chain, cloned, plus a new
    /// empty innermost frame for the child's own bindings.
    #[must_use]
    pub fn child(&self) -> Scope {
        let mut frames = self.frames.clone();
        frames.push(Frame::new());
        Scope { frames }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hdc::{create_from_name, Strategy};

    fn v(name: &str) -> Hv {
        create_from_name(name, 1024, Strategy::DenseBinary)
    }

    #[test]
    fn define_then_get() {
        let mut s = Scope::new();
        s.define("x", v("X")).unwrap();
        assert_eq!(s.get("x"), Some(&v("X")));
    }

    #[test]
    fn redefining_in_same_frame_fails() {
        let mut s = Scope::new();
        s.define("x", v("X")).unwrap();
        assert!(s.define("x", v("Y")).is_err());
    }

    #[test]
    fn set_is_upsert() {
        let mut s = Scope::new();
        s.set("x", v("X"));
        s.set("x", v("Y"));
        assert_eq!(s.get("x"), Some(&v("Y")));
    }

    #[test]
    fn get_walks_parent_frames() {
        let mut s = Scope::new();
        s.define("outer", v("O")).unwrap();
        s.push_frame();
        assert_eq!(s.get("outer"), Some(&v("O")));
    }

    #[test]
    fn child_is_independent_of_parent_mutation() {
        let mut parent = Scope::new();
        parent.define("x", v("X")).unwrap();
        let mut child = parent.child();
        child.set("x", v("Y"));
        assert_eq!(parent.get("x"), Some(&v("X")));
        assert_eq!(child.get("x"), Some(&v("Y")));
    }

    #[test]
    fn unbound_reference_errors() {
        let s = Scope::new();
        assert!(s.get_or_err("missing").is_err());
    }
}
