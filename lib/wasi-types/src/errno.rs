use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// Error codes returned by functions.
///
/// Not all of these error codes are returned by the functions provided by
/// this API; some are used in higher-level library layers, and others are
/// provided merely for alignment with POSIX.
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Errno {
    Success = 0,
    Toobig,
    Access,
    Addrinuse,
    Addrnotavail,
    Afnosupport,
    Again,
    Already,
    Badf,
    Badmsg,
    Busy,
    Canceled,
    Child,
    Connaborted,
    Connrefused,
    Connreset,
    Deadlk,
    Destaddrreq,
    Dom,
    Dquot,
    Exist,
    Fault,
    Fbig,
    Hostunreach,
    Idrm,
    Ilseq,
    Inprogress,
    Intr,
    Inval,
    Io,
    Isconn,
    Isdir,
    Loop,
    Mfile,
    Mlink,
    Msgsize,
    Multihop,
    Nametoolong,
    Netdown,
    Netreset,
    Netunreach,
    Nfile,
    Nobufs,
    Nodev,
    Noent,
    Noexec,
    Nolck,
    Nolink,
    Nomem,
    Nomsg,
    Noprotoopt,
    Nospc,
    Nosys,
    Notconn,
    Notdir,
    Notempty,
    Notrecoverable,
    Notsock,
    Notsup,
    Notty,
    Nxio,
    Overflow,
    Ownerdead,
    Perm,
    Pipe,
    Proto,
    Protonosupport,
    Prototype,
    Range,
    Rofs,
    Spipe,
    Srch,
    Stale,
    Timedout,
    Txtbsy,
    Xdev,
    Notcapable,
}

impl Errno {
    /// The raw status code handed back to the guest.
    pub fn raw(self) -> u16 {
        self.into()
    }

    pub fn is_success(self) -> bool {
        self == Errno::Success
    }

    pub fn message(&self) -> &'static str {
        match self {
            Errno::Success => "No error occurred. System call completed successfully.",
            Errno::Access => "Permission denied.",
            Errno::Addrinuse => "Address in use.",
            Errno::Addrnotavail => "Address not available.",
            Errno::Afnosupport => "Address family not supported.",
            Errno::Again => "Resource unavailable, or operation would block.",
            Errno::Badf => "Bad file descriptor.",
            Errno::Connaborted => "Connection aborted.",
            Errno::Connrefused => "Connection refused.",
            Errno::Connreset => "Connection reset.",
            Errno::Exist => "File exists.",
            Errno::Fault => "Bad address.",
            Errno::Hostunreach => "Host is unreachable.",
            Errno::Intr => "Interrupted function.",
            Errno::Inval => "Invalid argument.",
            Errno::Io => "I/O error.",
            Errno::Isconn => "Socket is connected.",
            Errno::Isdir => "Is a directory.",
            Errno::Mfile => "File descriptor value too large.",
            Errno::Nametoolong => "Filename too long.",
            Errno::Netunreach => "Network unreachable.",
            Errno::Noent => "No such file or directory.",
            Errno::Nospc => "No space left on device.",
            Errno::Nosys => "Function not supported.",
            Errno::Notconn => "The socket is not connected.",
            Errno::Notdir => "Not a directory or a symbolic link to a directory.",
            Errno::Notempty => "Directory not empty.",
            Errno::Notsup => "Not supported, or operation not supported on socket.",
            Errno::Overflow => "Value too large to be stored in data type.",
            Errno::Perm => "Operation not permitted.",
            Errno::Pipe => "Broken pipe.",
            Errno::Prototype => "Protocol wrong type for socket.",
            Errno::Spipe => "Invalid seek.",
            Errno::Timedout => "Connection timed out.",
            _ => "Unspecified error.",
        }
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Errno::{:?} ({}): {}", self, self.raw(), self.message())
    }
}

impl std::error::Error for Errno {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn errno_codes_follow_preview1_numbering() {
        assert_eq!(Errno::Success.raw(), 0);
        assert_eq!(Errno::Badf.raw(), 8);
        assert_eq!(Errno::Exist.raw(), 20);
        assert_eq!(Errno::Inval.raw(), 28);
        assert_eq!(Errno::Isconn.raw(), 30);
        assert_eq!(Errno::Noent.raw(), 44);
        assert_eq!(Errno::Notconn.raw(), 53);
        assert_eq!(Errno::Notsup.raw(), 58);
        assert_eq!(Errno::Prototype.raw(), 67);
        assert_eq!(Errno::Notcapable.raw(), 76);
    }

    #[test]
    fn errno_from_raw() {
        assert_eq!(Errno::try_from(31u16).ok(), Some(Errno::Isdir));
        assert!(Errno::try_from(77u16).is_err());
    }
}
