use std::collections::HashMap;

use super::instruction::Instruction;
use super::VmError;

/// A compiled function. Immutable once the compiler hands it over; per-call
/// state lives in the VM's frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    pub name: String,
    pub code: Vec<Instruction>,
    pub arg_names: Vec<String>,
    pub does_return: bool,
    /// Builtins are registered as chunks with no code so call sites resolve.
    pub builtin: bool,
}

impl Chunk {
    pub fn new(name: impl Into<String>, arg_names: Vec<String>, does_return: bool) -> Self {
        Chunk { name: name.into(), code: Vec::new(), arg_names, does_return, builtin: false }
    }

    /// True for the sentinel returned by a failed non-aborting lookup.
    pub fn is_sentinel(&self) -> bool {
        self.name.is_empty()
    }
}

/// What `lookup_chunk` does when a name is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Fail with [`VmError::UndefinedChunk`].
    Abort,
    /// Hand back an empty sentinel chunk and let the caller decide.
    Sentinel,
}

/// The chunk store: every compiled function plus a marker chunk per builtin,
/// in registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    chunks: Vec<Chunk>,
    index: HashMap<String, usize>,
    sentinel: Chunk,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chunk, replacing any existing chunk with the same name in place.
    pub fn insert(&mut self, chunk: Chunk) {
        match self.index.get(&chunk.name) {
            Some(&i) => self.chunks[i] = chunk,
            None => {
                self.index.insert(chunk.name.clone(), self.chunks.len());
                self.chunks.push(chunk);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Chunk> {
        self.index.get(name).map(|&i| &self.chunks[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Chunk> {
        self.index.get(name).map(|&i| &mut self.chunks[i])
    }

    pub fn lookup_chunk(&self, name: &str, policy: Lookup) -> Result<&Chunk, VmError> {
        match (self.get(name), policy) {
            (Some(chunk), _) => Ok(chunk),
            (None, Lookup::Abort) => Err(VmError::UndefinedChunk { name: name.to_string() }),
            (None, Lookup::Sentinel) => Ok(&self.sentinel),
        }
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    /// Compiled (non-builtin) chunks only.
    pub fn functions(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter().filter(|c| !c.builtin)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program_with(names: &[&str]) -> Program {
        let mut p = Program::new();
        for n in names {
            p.insert(Chunk::new(*n, vec![], false));
        }
        p
    }

    #[test]
    fn lookup_existing() {
        let p = program_with(&["main", "f"]);
        assert_eq!(p.lookup_chunk("f", Lookup::Abort).unwrap().name, "f");
    }

    #[test]
    fn lookup_missing_abort() {
        let p = program_with(&["main"]);
        let err = p.lookup_chunk("nope", Lookup::Abort).unwrap_err();
        assert!(matches!(err, VmError::UndefinedChunk { ref name } if name == "nope"));
    }

    #[test]
    fn lookup_missing_sentinel() {
        let p = program_with(&["main"]);
        let chunk = p.lookup_chunk("nope", Lookup::Sentinel).unwrap();
        assert!(chunk.is_sentinel());
        assert!(chunk.code.is_empty());
    }

    #[test]
    fn insertion_order_preserved() {
        let p = program_with(&["b", "a", "c"]);
        let names: Vec<&str> = p.chunks().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn reinsert_replaces_in_place() {
        let mut p = program_with(&["a", "b"]);
        let mut replacement = Chunk::new("a", vec!["x".into()], true);
        replacement.code.push(Instruction::Return);
        p.insert(replacement);
        assert_eq!(p.len(), 2);
        assert_eq!(p.chunks().next().unwrap().arg_names, ["x"]);
    }
}
