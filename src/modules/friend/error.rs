use crate::api::error::{Error, SystemError};

/// Domain taxonomy for friend-request mutations. These are usage errors the
/// caller is expected to surface to the end user; `Backend` carries real
/// infrastructure failures, which write paths always propagate.
#[derive(thiserror::Error, Debug)]
pub enum FriendError {
    #[error("users are already friends")]
    AlreadyFriends,
    #[error("a pending friend request already exists")]
    DuplicateRequest,
    #[error("the other user already sent you a request; accept it instead")]
    ReciprocalRequestExists,
    #[error("cannot send a friend request to yourself")]
    SelfRequest,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("friend request is not pending")]
    NotPending,
    #[error("not allowed to act on this friend request")]
    Forbidden,
    #[error(transparent)]
    Backend(#[from] SystemError),
}

impl From<FriendError> for Error {
    fn from(value: FriendError) -> Self {
        match value {
            FriendError::AlreadyFriends
            | FriendError::DuplicateRequest
            | FriendError::ReciprocalRequestExists => Error::conflict(value.to_string()),
            FriendError::NotFound(_) => Error::not_found(value.to_string()),
            FriendError::NotPending | FriendError::SelfRequest => {
                Error::bad_request(value.to_string())
            }
            FriendError::Forbidden => Error::forbidden(value.to_string()),
            FriendError::Backend(err) => err.into(),
        }
    }
}
