//! Joined channels and who holds operator status in them.

use cabal_proto::{irc_eq, irc_to_lower};
use std::collections::HashMap;

/// Ordered, case-insensitive set of channels. The home channel is always
/// the first member and cannot be removed.
#[derive(Debug, Clone)]
pub struct ChannelSet {
    channels: Vec<String>,
}

impl ChannelSet {
    pub fn new(home: impl Into<String>) -> Self {
        Self {
            channels: vec![home.into()],
        }
    }

    /// Home channel plus `extra`, duplicates collapsed.
    pub fn with_channels<I, S>(home: impl Into<String>, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new(home);
        for channel in extra {
            set.insert(channel);
        }
        set
    }

    pub fn home(&self) -> &str {
        &self.channels[0]
    }

    pub fn is_home(&self, channel: &str) -> bool {
        irc_eq(self.home(), channel)
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.channels.iter().any(|c| irc_eq(c, channel))
    }

    /// Returns `false` if the channel was already present.
    pub fn insert(&mut self, channel: impl Into<String>) -> bool {
        let channel = channel.into();
        if self.contains(&channel) {
            return false;
        }
        self.channels.push(channel);
        true
    }

    /// Returns `false` for the home channel and for unknown channels.
    pub fn remove(&mut self, channel: &str) -> bool {
        if self.is_home(channel) {
            return false;
        }
        let before = self.channels.len();
        self.channels.retain(|c| !irc_eq(c, channel));
        self.channels.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Prefix characters that grant operator-level privileges in NAMES output.
const OPERATOR_PREFIXES: &[char] = &['~', '&', '@'];
/// All membership prefix characters that may precede a nick in NAMES.
const MEMBER_PREFIXES: &[char] = &['~', '&', '@', '%', '+'];

/// Per-channel nick -> operator flag, keyed by case-folded names.
#[derive(Debug, Clone, Default)]
pub struct ChannelRoster {
    channels: HashMap<String, HashMap<String, bool>>,
}

impl ChannelRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.channels.clear();
    }

    /// Whether `nick` currently holds operator status in `channel`.
    pub fn is_operator(&self, channel: &str, nick: &str) -> bool {
        self.channels
            .get(&irc_to_lower(channel))
            .and_then(|members| members.get(&irc_to_lower(nick)))
            .copied()
            .unwrap_or(false)
    }

    pub fn is_member(&self, channel: &str, nick: &str) -> bool {
        self.channels
            .get(&irc_to_lower(channel))
            .is_some_and(|members| members.contains_key(&irc_to_lower(nick)))
    }

    pub fn member_count(&self, channel: &str) -> usize {
        self.channels
            .get(&irc_to_lower(channel))
            .map_or(0, HashMap::len)
    }

    /// Apply one `RPL_NAMREPLY` names list, e.g. `@Alice +Bob Carol`.
    pub fn add_names(&mut self, channel: &str, names: &str) {
        let members = self.channels.entry(irc_to_lower(channel)).or_default();
        for entry in names.split_whitespace() {
            let nick = entry.trim_start_matches(MEMBER_PREFIXES);
            if nick.is_empty() {
                continue;
            }
            let prefixes = &entry[..entry.len() - nick.len()];
            let op = prefixes.contains(OPERATOR_PREFIXES);
            // NAMES may list a nick with a userhost suffix (userhost-in-names)
            let nick = nick.split('!').next().unwrap_or(nick);
            members.insert(irc_to_lower(nick), op);
        }
    }

    pub fn add_member(&mut self, channel: &str, nick: &str) {
        self.channels
            .entry(irc_to_lower(channel))
            .or_default()
            .entry(irc_to_lower(nick))
            .or_insert(false);
    }

    pub fn remove_member(&mut self, channel: &str, nick: &str) {
        if let Some(members) = self.channels.get_mut(&irc_to_lower(channel)) {
            members.remove(&irc_to_lower(nick));
        }
    }

    /// Forget a channel entirely (we left it).
    pub fn drop_channel(&mut self, channel: &str) {
        self.channels.remove(&irc_to_lower(channel));
    }

    /// A user quit the network.
    pub fn remove_everywhere(&mut self, nick: &str) {
        let nick = irc_to_lower(nick);
        for members in self.channels.values_mut() {
            members.remove(&nick);
        }
    }

    pub fn rename(&mut self, old: &str, new: &str) {
        let old = irc_to_lower(old);
        let new = irc_to_lower(new);
        for members in self.channels.values_mut() {
            if let Some(op) = members.remove(&old) {
                members.insert(new.clone(), op);
            }
        }
    }

    pub fn set_operator(&mut self, channel: &str, nick: &str, op: bool) {
        self.channels
            .entry(irc_to_lower(channel))
            .or_default()
            .insert(irc_to_lower(nick), op);
    }

    /// Apply a channel `MODE` change such as `+ov-o Alice Bob Carol`,
    /// tracking only `o` but consuming arguments for the other modes.
    pub fn apply_mode(&mut self, channel: &str, params: &[String]) {
        let Some((modes, args)) = params.split_first() else {
            return;
        };
        let mut args = args.iter();
        let mut adding = true;
        for mode in modes.chars() {
            match mode {
                '+' => adding = true,
                '-' => adding = false,
                'o' => {
                    if let Some(nick) = args.next() {
                        self.set_operator(channel, nick, adding);
                    }
                }
                'q' | 'a' | 'h' | 'v' | 'b' | 'e' | 'I' | 'k' => {
                    args.next();
                }
                'l' | 'j' | 'f' if adding => {
                    args.next();
                }
                _ => {}
            }
        }
    }
}
