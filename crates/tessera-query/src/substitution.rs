//! # Query Token Substitution
//!
//! Query templates carry two families of tokens. Positional tokens
//! (`{0}`, `{1}`, …) are replaced verbatim with the columns of the outer
//! result row when a query chains into another query. Named tokens bind
//! the conventional leading columns (`{USER_NAME}`, `{COLL_NAME}`,
//! `{DATA_NAME}`, `{RESC_NAME}`) and the temporal values
//! (`{CURRENT_TIME}`, `{LIFETIME}`) resolved before the query runs.

use tessera_core::context::split_logical_path;
use tessera_core::{Context, Timestamp};

/// The named tokens bound to the conventional row columns, by position.
const NAMED_COLUMNS: [(usize, &str); 4] = [
    (0, "{USER_NAME}"),
    (1, "{COLL_NAME}"),
    (2, "{DATA_NAME}"),
    (3, "{RESC_NAME}"),
];

/// Replace positional and named column tokens with the row's values.
///
/// Values are inserted verbatim; a token whose column the row does not
/// carry is left in place.
pub fn substitute_row(template: &str, row: &[String]) -> String {
    let mut out = template.to_string();
    for (i, value) in row.iter().enumerate() {
        out = out.replace(&format!("{{{i}}}"), value);
    }
    for (i, token) in NAMED_COLUMNS {
        if let Some(value) = row.get(i) {
            out = out.replace(token, value);
        }
    }
    out
}

/// Replace named tokens with attributes from a triggering context.
///
/// `{COLL_NAME}` and `{DATA_NAME}` split from `logical_path`;
/// `{RESC_NAME}` binds the source resource. Tokens without a backing
/// attribute are left in place.
pub fn substitute_context(template: &str, context: &Context) -> String {
    let mut out = template.to_string();
    if let Some(user) = context.user_name() {
        out = out.replace("{USER_NAME}", user);
    }
    if let Some(path) = context.logical_path() {
        let (coll, name) = split_logical_path(path);
        out = out.replace("{COLL_NAME}", &coll);
        out = out.replace("{DATA_NAME}", &name);
    }
    if let Some(resource) = context.source_resource() {
        out = out.replace("{RESC_NAME}", resource);
        out = out.replace("{SOURCE_RESOURCE}", resource);
    }
    if let Some(resource) = context.destination_resource() {
        out = out.replace("{DESTINATION_RESOURCE}", resource);
    }
    out
}

/// Replace the temporal tokens.
///
/// `{CURRENT_TIME}` becomes `now` in epoch seconds; `{LIFETIME}` becomes
/// the cutoff (now minus the resolved window), when one was resolved.
pub fn substitute_time(template: &str, now: Timestamp, cutoff: Option<Timestamp>) -> String {
    let mut out = template.replace("{CURRENT_TIME}", &now.epoch_secs().to_string());
    if let Some(cutoff) = cutoff {
        out = out.replace("{LIFETIME}", &cutoff.epoch_secs().to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn positional_tokens_insert_verbatim() {
        let template = "SELECT RESC_NAME WHERE COLL_NAME = '{0}' AND DATA_NAME = '{1}'";
        let result = substitute_row(template, &row(&["/zone/coll", "f.dat"]));
        assert_eq!(
            result,
            "SELECT RESC_NAME WHERE COLL_NAME = '/zone/coll' AND DATA_NAME = 'f.dat'"
        );
    }

    #[test]
    fn named_tokens_follow_row_convention() {
        let template = "user={USER_NAME} path={COLL_NAME}/{DATA_NAME} resc={RESC_NAME}";
        let result = substitute_row(template, &row(&["alice", "/z/c", "d.bin", "r1"]));
        assert_eq!(result, "user=alice path=/z/c/d.bin resc=r1");
    }

    #[test]
    fn missing_columns_leave_tokens() {
        let result = substitute_row("{0}-{1}", &row(&["only"]));
        assert_eq!(result, "only-{1}");
    }

    #[test]
    fn context_tokens_split_the_logical_path() {
        use tessera_core::context::keys;
        let context = Context::new()
            .with(keys::USER_NAME, "alice")
            .with(keys::LOGICAL_PATH, "/zone/home/alice/f.dat")
            .with(keys::SOURCE_RESOURCE, "r1")
            .with(keys::DESTINATION_RESOURCE, "r2");
        let result = substitute_context(
            "WHERE COLL_NAME = '{COLL_NAME}' AND DATA_NAME = '{DATA_NAME}' AND RESC_NAME = '{RESC_NAME}' AND u = '{USER_NAME}' AND d = '{DESTINATION_RESOURCE}'",
            &context,
        );
        assert_eq!(
            result,
            "WHERE COLL_NAME = '/zone/home/alice' AND DATA_NAME = 'f.dat' AND RESC_NAME = 'r1' AND u = 'alice' AND d = 'r2'"
        );
    }

    #[test]
    fn context_tokens_without_attributes_stay() {
        let result = substitute_context("u = '{USER_NAME}'", &Context::new());
        assert_eq!(result, "u = '{USER_NAME}'");
    }

    #[test]
    fn temporal_tokens() {
        let now = Timestamp::from_epoch_secs(1_700_000_000).unwrap();
        let cutoff = now.minus_secs(3600);
        let result = substitute_time(
            "WHERE META_DATA_ATTR_VALUE <= '{LIFETIME}' AND x < '{CURRENT_TIME}'",
            now,
            Some(cutoff),
        );
        assert_eq!(
            result,
            "WHERE META_DATA_ATTR_VALUE <= '1699996400' AND x < '1700000000'"
        );
    }

    #[test]
    fn lifetime_token_untouched_without_cutoff() {
        let now = Timestamp::from_epoch_secs(1_700_000_000).unwrap();
        let result = substitute_time("v <= '{LIFETIME}'", now, None);
        assert_eq!(result, "v <= '{LIFETIME}'");
    }
}
