//! Channel name helpers.

/// Extension trait for recognising channel names.
pub trait ChannelExt {
    /// Whether the string looks like a channel name (`#`, `&`, `+` or `!`).
    fn is_channel_name(&self) -> bool;
}

impl ChannelExt for str {
    fn is_channel_name(&self) -> bool {
        matches!(self.chars().next(), Some('#' | '&' | '+' | '!')) && self.len() > 1
    }
}

impl ChannelExt for String {
    fn is_channel_name(&self) -> bool {
        self.as_str().is_channel_name()
    }
}
