//! Shape raw search entries into user and group records

use crate::backend::RawEntry;
use dirq_core::{
    GroupRecord, UserRecord, IS_MEMBER_OF_ATTR, MEMBER_OF_ATTR, POSIX_GROUP_CLASS,
    POSIX_MEMBER_ATTR,
};
use tracing::warn;

const OBJECT_CLASS_ATTR: &str = "objectClass";

/// Map entries to [`UserRecord`]s.
///
/// Referral entries and entries without `user_name_attr` are skipped. Group
/// membership is read from `memberOf` and then `isMemberOf`; when both are
/// present the latter wins.
pub fn transform_user_results(entries: Vec<RawEntry>, user_name_attr: &str) -> Vec<UserRecord> {
    let mut users = Vec::with_capacity(entries.len());

    for entry in entries {
        let Some(dn) = entry.dn else {
            continue;
        };
        let data = entry.attrs;

        let Some(username) = data.first(user_name_attr) else {
            warn!("Could not find {} in ldap attributes", user_name_attr);
            continue;
        };

        let mut groups = Vec::new();
        if let Some(values) = data.get(MEMBER_OF_ATTR) {
            groups = values.to_vec();
        }
        if let Some(values) = data.get(IS_MEMBER_OF_ATTR) {
            groups = values.to_vec();
        }

        users.push(UserRecord {
            dn,
            username: username.to_string(),
            first: data.first("givenName").map(str::to_string),
            last: data.first("sn").map(str::to_string),
            email: data.first("mail").map(str::to_string),
            groups,
        });
    }

    users
}

/// Map entries to [`GroupRecord`]s.
///
/// `members` is filled from `group_member_attr` for non-POSIX groups only;
/// `posix_members` from `memberUid` for entries whose objectClass includes
/// `posixGroup`. Group names pass through `normalize_name`.
pub fn transform_group_results(
    entries: Vec<RawEntry>,
    group_name_attr: &str,
    group_member_attr: &str,
    normalize_name: impl Fn(&str) -> String,
) -> Vec<GroupRecord> {
    let mut groups = Vec::with_capacity(entries.len());

    for entry in entries {
        let Some(dn) = entry.dn else {
            continue;
        };
        let data = entry.attrs;

        let Some(name) = data.first(group_name_attr) else {
            warn!("Could not find {} in ldap attributes", group_name_attr);
            continue;
        };
        let name = normalize_name(name);

        let is_posix = data.has_value(OBJECT_CLASS_ATTR, POSIX_GROUP_CLASS);

        let members = match data.get(group_member_attr) {
            Some(values) if !is_posix => values.to_vec(),
            _ => Vec::new(),
        };

        let posix_members = match data.get(POSIX_MEMBER_ATTR) {
            Some(values) if is_posix => values.to_vec(),
            _ => Vec::new(),
        };

        groups.push(GroupRecord {
            dn,
            name,
            members,
            posix_members,
        });
    }

    groups
}
