//! Numeric replies.
//!
//! Only the numerics the client reacts to get names; every other code is
//! still carried through as a [`Response`] with its raw value.

use std::fmt;

/// A three-digit numeric reply code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Response(pub u16);

impl Response {
    /// `001` - registration complete.
    pub const RPL_WELCOME: Response = Response(1);
    /// `353` - channel member list.
    pub const RPL_NAMREPLY: Response = Response(353);
    /// `366` - end of member list.
    pub const RPL_ENDOFNAMES: Response = Response(366);
    /// `403` - no such channel.
    pub const ERR_NOSUCHCHANNEL: Response = Response(403);
    /// `432` - erroneous nickname.
    pub const ERR_ERRONEUSNICKNAME: Response = Response(432);
    /// `433` - nickname already in use.
    pub const ERR_NICKNAMEINUSE: Response = Response(433);
    /// `471` - channel is full.
    pub const ERR_CHANNELISFULL: Response = Response(471);
    /// `473` - invite only channel.
    pub const ERR_INVITEONLYCHAN: Response = Response(473);
    /// `474` - banned from channel.
    pub const ERR_BANNEDFROMCHAN: Response = Response(474);
    /// `475` - bad channel key.
    pub const ERR_BADCHANNELKEY: Response = Response(475);
    /// `477` - registered nick required to join.
    pub const ERR_NEEDREGGEDNICK: Response = Response(477);
    /// `900` - logged in as an account.
    pub const RPL_LOGGEDIN: Response = Response(900);
    /// `902` - account is locked.
    pub const ERR_NICKLOCKED: Response = Response(902);
    /// `903` - SASL authentication succeeded.
    pub const RPL_SASLSUCCESS: Response = Response(903);
    /// `904` - SASL authentication failed.
    pub const ERR_SASLFAIL: Response = Response(904);
    /// `905` - SASL message too long.
    pub const ERR_SASLTOOLONG: Response = Response(905);
    /// `906` - SASL aborted.
    pub const ERR_SASLABORTED: Response = Response(906);
    /// `907` - already authenticated.
    pub const ERR_SASLALREADY: Response = Response(907);
    /// `908` - mechanism list.
    pub const RPL_SASLMECHS: Response = Response(908);

    /// The numeric value.
    #[inline]
    pub fn code(self) -> u16 {
        self.0
    }

    /// Whether this numeric reports a failure to join a channel.
    pub fn is_join_failure(self) -> bool {
        matches!(
            self,
            Self::ERR_NOSUCHCHANNEL
                | Self::ERR_CHANNELISFULL
                | Self::ERR_INVITEONLYCHAN
                | Self::ERR_BANNEDFROMCHAN
                | Self::ERR_BADCHANNELKEY
                | Self::ERR_NEEDREGGEDNICK
        )
    }

    /// Whether this numeric ends a SASL exchange unsuccessfully.
    pub fn is_sasl_failure(self) -> bool {
        matches!(
            self,
            Self::ERR_NICKLOCKED
                | Self::ERR_SASLFAIL
                | Self::ERR_SASLTOOLONG
                | Self::ERR_SASLABORTED
                | Self::RPL_SASLMECHS
        )
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}
