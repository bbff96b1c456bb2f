use once_cell::sync::Lazy;
use std::collections::HashMap;

/// One entry per entity table the generic data API may touch. Route path
/// parameters are resolved through this closed registry, so the table name
/// reaching SQL composition is always one of these static constants - never
/// raw request input.
#[derive(Debug)]
pub struct EntityTable {
    pub name: &'static str,
    /// Default columns for `search` (case-insensitive substring match).
    pub search_fields: &'static [&'static str],
}

pub static TABLES: &[EntityTable] = &[
    EntityTable { name: "students", search_fields: &["first_name", "last_name", "email", "roll_number"] },
    EntityTable { name: "teachers", search_fields: &["first_name", "last_name", "email", "subject"] },
    EntityTable { name: "classes", search_fields: &["name", "section"] },
    EntityTable { name: "subjects", search_fields: &["name", "code"] },
    EntityTable { name: "attendance", search_fields: &["remarks"] },
    EntityTable { name: "marks", search_fields: &["exam_name", "grade"] },
    EntityTable { name: "timetables", search_fields: &["day_of_week"] },
    EntityTable { name: "notes", search_fields: &["title", "description"] },
    EntityTable { name: "events", search_fields: &["title", "description", "venue"] },
    EntityTable { name: "fees", search_fields: &["term", "status"] },
];

static INDEX: Lazy<HashMap<&'static str, &'static EntityTable>> =
    Lazy::new(|| TABLES.iter().map(|t| (t.name, t)).collect());

/// Resolve a route path segment to its registry entry.
pub fn lookup(name: &str) -> Option<&'static EntityTable> {
    INDEX.get(name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_entities_resolve() {
        assert_eq!(lookup("students").unwrap().name, "students");
        assert_eq!(lookup("fees").unwrap().name, "fees");
    }

    #[test]
    fn unknown_entities_do_not() {
        assert!(lookup("identities").is_none());
        assert!(lookup("students; DROP TABLE students").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn registry_names_are_safe_identifiers() {
        for table in TABLES {
            assert!(
                table.name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
                "unsafe table name: {}",
                table.name
            );
            for field in table.search_fields {
                assert!(field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
            }
        }
    }
}
