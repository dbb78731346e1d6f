use super::types::Comment;

/// Order comments by creation time and bisect them into (old, new).
///
/// The split point is `len / 2`, so with an odd count the extra comment lands
/// in the new half. The sort is stable: comments with equal timestamps keep
/// their API order. Comments without a timestamp sort first.
pub fn split_comments(mut comments: Vec<Comment>) -> (Vec<Comment>, Vec<Comment>) {
    comments.sort_by_key(|c| c.created_at);
    let midpoint = comments.len() / 2;
    let new = comments.split_off(midpoint);
    (comments, new)
}
