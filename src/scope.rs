use std::collections::HashMap;

use log::trace;

/// Which kind of frame owns a slot, selecting global or frame-relative
/// addressing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Storage {
    Global,
    Local,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Slot {
    pub index: usize,
    pub storage: Storage,
}

struct Frame {
    label: Storage,
    next_slot: usize,
    slots: HashMap<Box<str>, usize>,
}

impl Frame {
    fn new(label: Storage) -> Frame {
        Frame {
            label,
            next_slot: 0,
            slots: HashMap::new(),
        }
    }
}

/// A stack of slot-allocation frames. The bottom frame is the global one and
/// is never popped.
pub struct Scope {
    frames: Vec<Frame>,
}

impl Default for Scope {
    fn default() -> Self {
        Scope::new()
    }
}

impl Scope {
    pub fn new() -> Scope {
        Scope {
            frames: vec![Frame::new(Storage::Global)],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(Frame::new(Storage::Local));
        trace!("pushed frame (depth {})", self.frames.len());
    }

    pub fn pop(&mut self) -> Result<(), Error> {
        if self.frames.len() == 1 {
            return Err(Error::Underflow);
        }
        self.frames.pop();
        trace!("popped frame (depth {})", self.frames.len());
        Ok(())
    }

    /// Assigns the next slot of the innermost frame to `name`.
    pub fn declare(&mut self, name: &str) -> Result<usize, Error> {
        let frame = self.innermost_mut();
        if frame.slots.contains_key(name) {
            return Err(Error::AlreadyDeclared(name.into()));
        }
        let slot = frame.next_slot;
        frame.next_slot += 1;
        frame.slots.insert(name.into(), slot);
        trace!("declared {name} at {:?} slot {slot}", frame.label);
        Ok(slot)
    }

    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.resolve(name).map(|slot| slot.index)
    }

    /// Like [`Scope::lookup`], also reporting the owning frame's storage.
    pub fn resolve(&self, name: &str) -> Option<Slot> {
        self.frames.iter().rev().find_map(|frame| {
            frame.slots.get(name).map(|&index| Slot {
                index,
                storage: frame.label,
            })
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Number of slots allocated in the innermost frame.
    pub fn frame_len(&self) -> usize {
        self.innermost().next_slot
    }

    fn innermost(&self) -> &Frame {
        self.frames.last().expect("global frame is never popped")
    }

    fn innermost_mut(&mut self) -> &mut Frame {
        self.frames
            .last_mut()
            .expect("global frame is never popped")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Tried to pop the global frame.
    Underflow,
    AlreadyDeclared(Box<str>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_then_lookup() {
        let mut scope = Scope::new();
        assert_eq!(scope.declare("a"), Ok(0));
        assert_eq!(scope.declare("b"), Ok(1));
        assert_eq!(scope.lookup("a"), Some(0));
        assert_eq!(scope.lookup("b"), Some(1));
        assert_eq!(scope.lookup("c"), None);
        assert_eq!(scope.frame_len(), 2);
    }

    #[test]
    fn duplicate_in_same_frame() {
        let mut scope = Scope::new();
        scope.declare("a").unwrap();
        assert_eq!(scope.declare("a"), Err(Error::AlreadyDeclared("a".into())));
    }

    #[test]
    fn local_frames_restart_slots_and_shadow() {
        let mut scope = Scope::new();
        scope.declare("x").unwrap();
        scope.declare("y").unwrap();
        scope.push();
        assert_eq!(scope.frame_len(), 0);
        assert_eq!(scope.declare("x"), Ok(0));
        assert_eq!(
            scope.resolve("x"),
            Some(Slot {
                index: 0,
                storage: Storage::Local
            })
        );
        assert_eq!(
            scope.resolve("y"),
            Some(Slot {
                index: 1,
                storage: Storage::Global
            })
        );
        scope.pop().unwrap();
        assert_eq!(
            scope.resolve("x"),
            Some(Slot {
                index: 0,
                storage: Storage::Global
            })
        );
    }

    #[test]
    fn popped_names_are_unresolvable() {
        let mut scope = Scope::new();
        scope.push();
        scope.declare("n").unwrap();
        scope.pop().unwrap();
        assert_eq!(scope.lookup("n"), None);
    }

    #[test]
    fn global_frame_is_never_popped() {
        let mut scope = Scope::new();
        assert_eq!(scope.pop(), Err(Error::Underflow));
        scope.push();
        assert_eq!(scope.pop(), Ok(()));
        assert_eq!(scope.pop(), Err(Error::Underflow));
    }
}
