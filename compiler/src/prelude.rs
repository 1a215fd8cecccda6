//! Bundled declarations of the built-in classes

use parser::{parse_mino_file, MinoFile, ParseError};
use source_map::SourceMap;

pub const PRELUDE_NAME: &str = "<prelude>";

pub const PRELUDE_SOURCE: &str = include_str!("prelude.mino");

/// Add the prelude to `source_map` and parse it
pub fn load_prelude(source_map: &mut SourceMap) -> Result<MinoFile, ParseError> {
    let file_id = source_map.add_file(PRELUDE_NAME, PRELUDE_SOURCE);
    parse_mino_file(file_id, PRELUDE_NAME, PRELUDE_SOURCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_declares_every_builtin() {
        let mut source_map = SourceMap::new();
        let prelude = load_prelude(&mut source_map).expect("prelude parses");
        let names: Vec<&str> = prelude.classes.iter().map(|c| c.name.name.as_str()).collect();
        assert_eq!(names, ["Object", "Boolean", "Integer", "Float", "String"]);
        assert!(prelude.statements.is_empty());
    }
}
