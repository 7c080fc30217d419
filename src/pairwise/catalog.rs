//! Option catalog: the fixed, ordered set of engine tunables under test.

#![allow(missing_docs)]

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::core::errors::{Result, SrhError};

/// MySQL system variables exercised by the configuration fuzz campaign.
pub const DEFAULT_MYSQL_OPTIONS: [&str; 46] = [
    "big_tables",
    "completion_type",
    "bulk_insert_buffer_size",
    "concurrent_insert",
    "cte_max_recursion_depth",
    "delay_key_write",
    "eq_range_index_dive_limit",
    "flush",
    "foreign_key_checks",
    "histogram_generation_max_mem_size",
    "host_cache_size",
    "internal_tmp_mem_storage_engine",
    "join_buffer_size",
    "max_heap_table_size",
    "max_length_for_sort_data",
    "max_points_in_geometry",
    "max_seeks_for_key",
    "max_sort_length",
    "max_sp_recursion_depth",
    "myisam_data_pointer_size",
    "myisam_max_sort_file_size",
    "myisam_sort_buffer_size",
    "myisam_stats_method",
    "myisam_use_mmap",
    "old_alter_table",
    "optimizer_prune_level",
    "optimizer_search_depth",
    "optimizer_switch",
    "parser_max_mem_size",
    "preload_buffer_size",
    "query_alloc_block_size",
    "query_prealloc_size",
    "range_alloc_block_size",
    "range_optimizer_max_mem_size",
    "rbr_exec_mode",
    "read_buffer_size",
    "read_rnd_buffer_size",
    "schema_definition_cache",
    "show_create_table_verbosity",
    "show_old_temporals",
    "sql_auto_is_null",
    "sql_buffer_result",
    "sql_log_off",
    "sql_quote_show_create",
    "tmp_table_size",
    "unique_checks",
];

fn option_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex compiles"))
}

/// Whether `name` can appear in a weight-table record unescaped.
pub fn is_valid_option_name(name: &str) -> bool {
    option_name_regex().is_match(name)
}

/// Distinct option names in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionCatalog {
    names: Vec<String>,
}

impl OptionCatalog {
    /// Build a catalog, rejecting duplicates and names that would break the
    /// `a,b:w` record format.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for name in names {
            let name = name.into();
            if !is_valid_option_name(&name) {
                return Err(SrhError::InvalidConfig {
                    details: format!("option name {name:?} must match [A-Za-z_][A-Za-z0-9_]*"),
                });
            }
            if !seen.insert(name.clone()) {
                return Err(SrhError::InvalidConfig {
                    details: format!("duplicate option name {name:?} in catalog"),
                });
            }
            out.push(name);
        }
        Ok(Self { names: out })
    }

    /// The built-in MySQL catalog.
    pub fn mysql_default() -> Self {
        Self {
            names: DEFAULT_MYSQL_OPTIONS.iter().map(|n| (*n).to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Number of unordered pairs, `n(n-1)/2`.
    pub fn pair_count(&self) -> usize {
        let n = self.names.len();
        n * n.saturating_sub(1) / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_is_valid_and_distinct() {
        let cat = OptionCatalog::new(DEFAULT_MYSQL_OPTIONS).expect("default catalog valid");
        assert_eq!(cat, OptionCatalog::mysql_default());
        assert_eq!(cat.len(), 46);
        assert_eq!(cat.pair_count(), 1035);
        assert_eq!(cat.names()[0], "big_tables");
        assert_eq!(cat.names()[45], "unique_checks");
    }

    #[test]
    fn duplicates_rejected() {
        let err = OptionCatalog::new(["sql_log_off", "flush", "sql_log_off"]).unwrap_err();
        assert!(err.to_string().contains("duplicate"), "{err}");
    }

    #[test]
    fn delimiter_characters_rejected() {
        assert!(OptionCatalog::new(["a,b"]).is_err());
        assert!(OptionCatalog::new(["a:b"]).is_err());
        assert!(OptionCatalog::new([""]).is_err());
        assert!(OptionCatalog::new(["1abc"]).is_err());
        assert!(OptionCatalog::new(["_ok", "also_ok2"]).is_ok());
    }

    #[test]
    fn pair_count_for_small_catalogs() {
        assert_eq!(OptionCatalog::new(Vec::<String>::new()).unwrap().pair_count(), 0);
        assert_eq!(OptionCatalog::new(["a"]).unwrap().pair_count(), 0);
        assert_eq!(OptionCatalog::new(["a", "b"]).unwrap().pair_count(), 1);
        assert_eq!(OptionCatalog::new(["a", "b", "c"]).unwrap().pair_count(), 3);
    }
}
