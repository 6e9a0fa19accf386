//! Column-role resolution for loosely structured drillhole tables.
//!
//! Source files name their columns inconsistently (`HoleID`, `BHID`,
//! `Easting`, `mE`, `From_m`, ...). The resolver maps actual column names
//! to canonical semantic roles, either from an explicit caller-supplied
//! mapping or by heuristic substring scoring. Downstream engines only ever
//! see resolved roles.

use std::collections::HashMap;

use thiserror::Error;

/// Errors that can occur during column resolution.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// An explicit mapping names a column that the table does not have.
    #[error("mapped column '{column}' for role '{role}' not found in table")]
    MissingColumn { role: &'static str, column: String },

    /// An explicit mapping omits a required role.
    #[error("explicit mapping does not cover required role '{0}'")]
    UnmappedRole(&'static str),

    /// Heuristic scoring found no candidate column for a required role.
    #[error("could not identify a column for role '{0}'")]
    Unresolved(&'static str),
}

/// Canonical semantic roles a source column can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    HoleId,
    Easting,
    Northing,
    Elevation,
    Depth,
    Dip,
    Azimuth,
    From,
    To,
    Category,
}

impl Role {
    /// Stable lowercase name, used in mappings and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Role::HoleId => "hole_id",
            Role::Easting => "easting",
            Role::Northing => "northing",
            Role::Elevation => "elevation",
            Role::Depth => "depth",
            Role::Dip => "dip",
            Role::Azimuth => "azimuth",
            Role::From => "from",
            Role::To => "to",
            Role::Category => "category",
        }
    }

    /// Parses the stable name back into a role. Used when mappings arrive
    /// as plain string keys (e.g. from a JSON document).
    pub fn from_name(name: &str) -> Option<Role> {
        match name {
            "hole_id" => Some(Role::HoleId),
            "easting" => Some(Role::Easting),
            "northing" => Some(Role::Northing),
            "elevation" => Some(Role::Elevation),
            "depth" => Some(Role::Depth),
            "dip" => Some(Role::Dip),
            "azimuth" => Some(Role::Azimuth),
            "from" => Some(Role::From),
            "to" => Some(Role::To),
            "category" => Some(Role::Category),
            _ => None,
        }
    }
}

/// How a rule pattern is matched against a normalized column name.
#[derive(Debug, Clone, Copy)]
enum MatchKind {
    Exact,
    Prefix,
    Contains,
}

/// One scoring rule: pattern match kind, pattern, weight.
type Rule = (MatchKind, &'static str, i32);

/// Ordered scoring rules per role. Patterns are compared against
/// normalized names (lowercased, separators stripped), so `hole_id`,
/// `HoleID` and `hole id` all normalize to `holeid`. Earlier rules win
/// ties at equal weight.
fn rules_for(role: Role) -> &'static [Rule] {
    use MatchKind::*;
    match role {
        Role::HoleId => &[
            (Exact, "holeid", 100),
            (Contains, "holeid", 90),
            (Contains, "bhid", 90),
            (Contains, "hole", 60),
            (Exact, "id", 30),
        ],
        Role::Easting => &[
            (Exact, "easting", 100),
            (Contains, "east", 80),
            (Exact, "x", 40),
        ],
        Role::Northing => &[
            (Exact, "northing", 100),
            (Contains, "north", 80),
            (Exact, "y", 40),
        ],
        Role::Elevation => &[
            (Prefix, "rl", 100),
            (Contains, "elev", 90),
            (Exact, "z", 40),
        ],
        Role::Depth => &[(Exact, "depth", 100), (Contains, "depth", 70)],
        Role::Dip => &[(Exact, "dip", 100), (Contains, "incl", 70)],
        Role::Azimuth => &[(Exact, "azimuth", 100), (Contains, "azi", 80)],
        Role::From => &[(Exact, "from", 100), (Prefix, "from", 80)],
        // "to" rules must never pick up a from-column like "from_to_avg";
        // the scorer excludes candidates containing "from" for this role.
        Role::To => &[(Exact, "to", 100), (Prefix, "to", 80), (Contains, "to", 30)],
        Role::Category => &[
            (Contains, "litho", 90),
            (Contains, "alteration", 80),
            (Contains, "code", 50),
            (Contains, "type", 40),
        ],
    }
}

/// Lowercases a column name and strips separator characters.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' ' | '.'))
        .flat_map(|c| c.to_lowercase())
        .collect()
}

fn rule_matches(kind: MatchKind, pattern: &str, normalized: &str) -> bool {
    match kind {
        MatchKind::Exact => normalized == pattern,
        MatchKind::Prefix => normalized.starts_with(pattern),
        MatchKind::Contains => normalized.contains(pattern),
    }
}

/// Maps ambiguous source column names to canonical roles.
///
/// Stateless strategy object: either applies an explicit caller-supplied
/// mapping (validated against the table) or scores every column against
/// each requested role's rule list.
#[derive(Debug, Default)]
pub struct ColumnResolver;

impl ColumnResolver {
    /// Resolves `roles` against `columns`.
    ///
    /// With `explicit` supplied, every requested role must be mapped to an
    /// existing column or resolution fails. Without it, each role is
    /// assigned the highest-scoring column; ties break by rule order, then
    /// by column order.
    pub fn resolve(
        columns: &[String],
        roles: &[Role],
        explicit: Option<&HashMap<Role, String>>,
    ) -> Result<HashMap<Role, String>, ResolveError> {
        if let Some(mapping) = explicit {
            return Self::resolve_explicit(columns, roles, mapping);
        }
        Self::resolve_heuristic(columns, roles)
    }

    fn resolve_explicit(
        columns: &[String],
        roles: &[Role],
        mapping: &HashMap<Role, String>,
    ) -> Result<HashMap<Role, String>, ResolveError> {
        let mut resolved = HashMap::with_capacity(roles.len());
        for &role in roles {
            let column = mapping
                .get(&role)
                .ok_or(ResolveError::UnmappedRole(role.name()))?;
            if !columns.iter().any(|c| c == column) {
                return Err(ResolveError::MissingColumn {
                    role: role.name(),
                    column: column.clone(),
                });
            }
            resolved.insert(role, column.clone());
        }
        Ok(resolved)
    }

    fn resolve_heuristic(
        columns: &[String],
        roles: &[Role],
    ) -> Result<HashMap<Role, String>, ResolveError> {
        let normalized: Vec<String> = columns.iter().map(|c| normalize(c)).collect();

        let mut resolved = HashMap::with_capacity(roles.len());
        for &role in roles {
            let mut best: Option<(i32, usize, usize)> = None; // (weight, rule_idx, col_idx)

            for (rule_idx, &(kind, pattern, weight)) in rules_for(role).iter().enumerate() {
                for (col_idx, norm) in normalized.iter().enumerate() {
                    if role == Role::To && norm.contains("from") {
                        continue;
                    }
                    if !rule_matches(kind, pattern, norm) {
                        continue;
                    }
                    let candidate = (weight, rule_idx, col_idx);
                    let better = match best {
                        None => true,
                        Some((w, r, c)) => {
                            weight > w || (weight == w && (rule_idx, col_idx) < (r, c))
                        }
                    };
                    if better {
                        best = Some(candidate);
                    }
                }
            }

            match best {
                Some((_, _, col_idx)) => {
                    resolved.insert(role, columns[col_idx].clone());
                }
                None => return Err(ResolveError::Unresolved(role.name())),
            }
        }

        log::debug!("resolved columns: {:?}", resolved);
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Hole_ID"), "holeid");
        assert_eq!(normalize("From (m)"), "from(m)");
        assert_eq!(normalize("RL-m"), "rlm");
    }

    #[test]
    fn test_heuristic_collar_columns() {
        let columns = cols(&["BHID", "mE_East", "mN_North", "RL_m"]);
        let roles = [Role::HoleId, Role::Easting, Role::Northing, Role::Elevation];
        let resolved = ColumnResolver::resolve(&columns, &roles, None).unwrap();

        assert_eq!(resolved[&Role::HoleId], "BHID");
        assert_eq!(resolved[&Role::Easting], "mE_East");
        assert_eq!(resolved[&Role::Northing], "mN_North");
        assert_eq!(resolved[&Role::Elevation], "RL_m");
    }

    #[test]
    fn test_exact_beats_contains() {
        // "hole_id" should win over "drill_hole_name" despite both matching.
        let columns = cols(&["drill_hole_name", "hole_id"]);
        let resolved = ColumnResolver::resolve(&columns, &[Role::HoleId], None).unwrap();
        assert_eq!(resolved[&Role::HoleId], "hole_id");
    }

    #[test]
    fn test_to_never_matches_from() {
        let columns = cols(&["hole_id", "from_m", "to_m"]);
        let roles = [Role::From, Role::To];
        let resolved = ColumnResolver::resolve(&columns, &roles, None).unwrap();
        assert_eq!(resolved[&Role::From], "from_m");
        assert_eq!(resolved[&Role::To], "to_m");
    }

    #[test]
    fn test_tie_broken_by_column_order() {
        let columns = cols(&["depth_1", "depth_2"]);
        let resolved = ColumnResolver::resolve(&columns, &[Role::Depth], None).unwrap();
        assert_eq!(resolved[&Role::Depth], "depth_1");
    }

    #[test]
    fn test_unresolved_role_fails() {
        let columns = cols(&["foo", "bar"]);
        let err = ColumnResolver::resolve(&columns, &[Role::Dip], None).unwrap_err();
        assert!(matches!(err, ResolveError::Unresolved("dip")));
    }

    #[test]
    fn test_explicit_mapping() {
        let columns = cols(&["WellName", "Inclination"]);
        let mut mapping = HashMap::new();
        mapping.insert(Role::HoleId, "WellName".to_string());
        mapping.insert(Role::Dip, "Inclination".to_string());

        let resolved =
            ColumnResolver::resolve(&columns, &[Role::HoleId, Role::Dip], Some(&mapping)).unwrap();
        assert_eq!(resolved[&Role::HoleId], "WellName");
        assert_eq!(resolved[&Role::Dip], "Inclination");
    }

    #[test]
    fn test_explicit_mapping_missing_column() {
        let columns = cols(&["WellName"]);
        let mut mapping = HashMap::new();
        mapping.insert(Role::HoleId, "NoSuchColumn".to_string());

        let err =
            ColumnResolver::resolve(&columns, &[Role::HoleId], Some(&mapping)).unwrap_err();
        assert!(matches!(err, ResolveError::MissingColumn { .. }));
    }

    #[test]
    fn test_explicit_mapping_unmapped_role() {
        let columns = cols(&["WellName", "Dip"]);
        let mut mapping = HashMap::new();
        mapping.insert(Role::HoleId, "WellName".to_string());

        let err = ColumnResolver::resolve(&columns, &[Role::HoleId, Role::Dip], Some(&mapping))
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnmappedRole("dip")));
    }
}
