use thiserror::Error;

/// Errors surfaced from `Station` setup and control, as opposed to the
/// per-transport/per-device errors defined alongside their own modules.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("channel {0} is not configured on this station")]
    UnknownChannel(usize),

    #[error("error during soundcard initialisation")]
    SoundcardInit,

    #[error("unable to locate sound card '{0}' - is it in use?")]
    SoundcardNotFound(String),

    #[error(transparent)]
    Ptt(#[from] crate::ptt::PttError),

    #[error(transparent)]
    Transport(#[from] crate::transport::TransportError),
}
