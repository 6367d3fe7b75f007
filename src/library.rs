use serde::{Deserialize, Serialize};

/// Function name that marks a table slot as unused; the decompiler can be
/// told to drop tokens resolving to it.
pub const UNUSED_FUNCTION_NAME: &str = "@Unused";

/// Metadata for one opcode table of the target game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageLibrary {
    pub name: String,
    /// Equals the function tokens' table_index.
    pub index: u8,
    pub functions: Vec<LibraryFunction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryFunction {
    pub name: String,
    pub index: u8,
    /// Parameter names; the count doubles as the tag argument count.
    pub parameters: Vec<String>,
}

/// The full set of opcode tables known for a game.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionLibrary {
    pub libraries: Vec<MessageLibrary>,
}

impl FunctionLibrary {
    pub fn new(libraries: Vec<MessageLibrary>) -> Self {
        Self { libraries }
    }

    /// Case-sensitive name lookup across all tables.
    pub fn find_by_name(&self, name: &str) -> Option<(u8, &LibraryFunction)> {
        for library in &self.libraries {
            for function in &library.functions {
                if function.name == name {
                    return Some((library.index, function));
                }
            }
        }

        None
    }

    pub fn find_by_index(&self, table_index: u8, function_index: u8) -> Option<&LibraryFunction> {
        self.libraries
            .iter()
            .find(|library| library.index == table_index)?
            .functions
            .iter()
            .find(|function| function.index == function_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FunctionLibrary {
        FunctionLibrary::new(vec![MessageLibrary {
            name: "System".to_string(),
            index: 2,
            functions: vec![
                LibraryFunction {
                    name: "wait".to_string(),
                    index: 1,
                    parameters: vec![],
                },
                LibraryFunction {
                    name: "voice".to_string(),
                    index: 5,
                    parameters: vec!["cue".to_string()],
                },
            ],
        }])
    }

    #[test]
    fn test_lookup_by_name_is_case_sensitive() {
        let lib = sample();

        let (table, function) = lib.find_by_name("voice").unwrap();
        assert_eq!(table, 2);
        assert_eq!(function.index, 5);
        assert_eq!(function.parameters.len(), 1);

        assert!(lib.find_by_name("Voice").is_none());
    }

    #[test]
    fn test_lookup_by_index() {
        let lib = sample();

        assert_eq!(lib.find_by_index(2, 1).unwrap().name, "wait");
        assert!(lib.find_by_index(3, 1).is_none());
        assert!(lib.find_by_index(2, 9).is_none());
    }
}
