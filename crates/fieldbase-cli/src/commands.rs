//! Subcommand definitions.

use clap::Subcommand;
use std::path::PathBuf;

/// Workspace commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Replace the workspace with the contents of a JSON state file
    Import {
        /// Path to the state file
        file: PathBuf,
    },

    /// List field definitions and catalogs
    Schemas {
        /// Include inactive schemas
        #[arg(long)]
        all: bool,
    },

    /// List the entries of a reference definition or catalog
    Entries {
        /// Definition or catalog id
        schema: String,
    },

    /// Show everything linked to an entry
    Resolve {
        /// Reference or catalog entry id
        entry: String,
    },

    /// Show which entries store an entry id
    Usage {
        /// Reference or catalog entry id
        entry: String,
    },

    /// Find deals referencing entries
    Deals {
        /// Entry ids
        #[arg(required = true)]
        entries: Vec<String>,

        /// Also match deals referencing entries linked to the given ones
        #[arg(long)]
        linked: bool,
    },

    /// List selectable entries for a reference sub-field
    Candidates {
        /// Reference definition id
        definition: String,

        /// Sub-field id
        sub_field: String,

        /// Current sibling values as field=value
        #[arg(long = "set", value_parser = parse_assignment)]
        values: Vec<(String, String)>,
    },

    /// Show whether a field is locked by stored values
    Locked {
        /// Field, sub-field or catalog column id
        field: String,
    },

    /// Point a catalog link at another catalog
    Retarget {
        /// Catalog link field id
        field: String,

        /// New target catalog id
        catalog: String,

        /// Purge existing values if the field is in use
        #[arg(long)]
        confirm: bool,
    },

    /// Delete a field definition, or deactivate it if in use
    Delete {
        /// Field definition id
        definition: String,
    },
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected field=value, got '{}'", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("order_company=C1").unwrap(),
            ("order_company".to_string(), "C1".to_string())
        );
        assert!(parse_assignment("order_company").is_err());
        assert!(parse_assignment("=C1").is_err());
    }
}
