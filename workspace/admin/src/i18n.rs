use std::borrow::Cow;

/// Translation hook for user-facing labels.
///
/// No catalogs are loaded, so every message id is its own translation.
pub fn gettext(msgid: &'static str) -> Cow<'static, str> {
    Cow::Borrowed(msgid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_message_through() {
        assert_eq!(gettext("Personal info"), "Personal info");
    }
}
