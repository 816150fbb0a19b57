//! Schemas of the FreeSpace tables the parser knows about, and how to pick
//! one for a file.

mod armor;
pub use armor::armor_table;

use std::fmt;
use std::path::Path;

use fsotbl_parse::Node;

/// A known table kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    /// `armor.tbl` and `*-amr.tbm`.
    Armor,
}

impl TableKind {
    /// Every known table kind.
    pub const ALL: &'static [TableKind] = &[TableKind::Armor];

    /// Look a table up by its short name (`armor`), ignoring case.
    pub fn from_name(name: &str) -> Option<TableKind> {
        TableKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    /// Pick the table for a file name: `<name>.tbl` or modular `*-<suffix>.tbm`.
    pub fn from_path(path: impl AsRef<Path>) -> Option<TableKind> {
        let file_name = path.as_ref().file_name()?.to_str()?.to_ascii_lowercase();
        TableKind::ALL.iter().copied().find(|kind| {
            file_name == format!("{}.tbl", kind.name())
                || file_name.ends_with(&format!("-{}.tbm", kind.modular_suffix()))
        })
    }

    /// Short name used on the command line and in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            TableKind::Armor => "armor",
        }
    }

    /// Suffix of modular table files, as in `mymod-amr.tbm`.
    pub fn modular_suffix(&self) -> &'static str {
        match self {
            TableKind::Armor => "amr",
        }
    }

    /// Build the schema for this table.
    pub fn schema(&self) -> Vec<Node> {
        match self {
            TableKind::Armor => armor_table(),
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
