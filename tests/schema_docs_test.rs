//! The README's table listing must name exactly the tables the migrations create.

const MIGRATION: &str =
    include_str!("../migrations/20260101000000_create_glass_lookup_schema.sql");
const README: &str = include_str!("../README.md");

fn created_tables() -> Vec<&'static str> {
    MIGRATION
        .lines()
        .filter_map(|line| line.trim().strip_prefix("CREATE TABLE IF NOT EXISTS "))
        .filter_map(|rest| rest.split_whitespace().next())
        .collect()
}

fn documented_tables() -> Vec<&'static str> {
    README
        .lines()
        .filter_map(|line| line.strip_prefix("| `"))
        .filter_map(|rest| rest.split('`').next())
        .collect()
}

#[test]
fn test_readme_lists_every_migrated_table() {
    let mut created = created_tables();
    let mut documented = documented_tables();
    created.sort_unstable();
    documented.sort_unstable();

    assert_eq!(created.len(), 4);
    assert_eq!(documented, created);
}

#[test]
fn test_readme_uses_real_audit_table_name() {
    let stale = README
        .match_indices("lookup_log")
        .filter(|(at, _)| !README[..*at].ends_with("nags_"))
        .count();
    assert_eq!(stale, 0, "README refers to a lookup_log table that does not exist");
}
