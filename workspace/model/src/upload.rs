use chrono::{DateTime, Utc};

/// Root directory for uploaded profile pictures.
pub const PROFILE_PICTURE_DIR: &str = "profile_pics";

/// Build the date-partitioned storage path for a profile picture.
///
/// Only the final component of `file_name` is kept, so a client cannot
/// place files outside `profile_pics/YYYY/MM/DD/`. Returns `None` when no
/// file name is left after stripping.
pub fn profile_picture_path(file_name: &str, at: DateTime<Utc>) -> Option<String> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name).trim();
    if base.is_empty() || base == "." || base == ".." {
        return None;
    }
    Some(format!(
        "{}/{}/{}",
        PROFILE_PICTURE_DIR,
        at.format("%Y/%m/%d"),
        base
    ))
}
