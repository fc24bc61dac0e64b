use time::OffsetDateTime;

/// Revocation-by-timestamp rule: a token is live unless the password changed
/// strictly after it was issued. There is no blacklist; this comparison is
/// the sole revocation mechanism.
///
/// Both sides compare at whole unix seconds (`unix_timestamp` floors the
/// stored timestamp), so a token minted within the same second as the
/// password change is accepted. The boundary is pinned by tests below.
pub fn issued_after_password_change(
    issued_at_unix: i64,
    password_changed_at: Option<OffsetDateTime>,
) -> bool {
    match password_changed_at {
        None => true,
        Some(changed_at) => issued_at_unix >= changed_at.unix_timestamp(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn valid_when_password_never_changed() {
        assert!(issued_after_password_change(0, None));
        assert!(issued_after_password_change(1_700_000_000, None));
    }

    #[test]
    fn invalid_when_changed_after_issue() {
        let changed = datetime!(2024-06-01 12:00:05 UTC);
        let issued = changed.unix_timestamp() - 1;
        assert!(!issued_after_password_change(issued, Some(changed)));
    }

    #[test]
    fn valid_when_issued_after_change() {
        let changed = datetime!(2024-06-01 12:00:05 UTC);
        let issued = changed.unix_timestamp() + 1;
        assert!(issued_after_password_change(issued, Some(changed)));
    }

    #[test]
    fn same_second_counts_as_valid() {
        // Strict `>` on the stored side: equality at second resolution passes.
        let changed = datetime!(2024-06-01 12:00:05 UTC);
        assert!(issued_after_password_change(
            changed.unix_timestamp(),
            Some(changed)
        ));
    }

    #[test]
    fn sub_second_change_is_floored() {
        // A change recorded at 12:00:05.900 floors to 12:00:05, so a token
        // issued at 12:00:05 is still accepted.
        let changed = datetime!(2024-06-01 12:00:05.900 UTC);
        let issued = datetime!(2024-06-01 12:00:05 UTC).unix_timestamp();
        assert!(issued_after_password_change(issued, Some(changed)));
    }
}
