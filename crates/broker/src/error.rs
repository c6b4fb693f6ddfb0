use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("cannot connect to broker {broker}: {message}")]
    Connectivity { broker: String, message: String },

    #[error("{0}")]
    Protocol(String),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("broker task failed: {0}")]
    Join(String),
}

/// Coarse classification used when reporting failures to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connectivity,
    Protocol,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        use rdkafka::types::RDKafkaErrorCode;

        match self {
            Error::Connectivity { .. } | Error::Timeout(_) | Error::Join(_) => {
                ErrorKind::Connectivity
            }
            Error::Protocol(_) => ErrorKind::Protocol,
            Error::Kafka(e) => match e.rdkafka_error_code() {
                Some(
                    RDKafkaErrorCode::BrokerTransportFailure
                    | RDKafkaErrorCode::AllBrokersDown
                    | RDKafkaErrorCode::Resolve
                    | RDKafkaErrorCode::OperationTimedOut
                    | RDKafkaErrorCode::MessageTimedOut
                    | RDKafkaErrorCode::RequestTimedOut
                    | RDKafkaErrorCode::NetworkException,
                ) => ErrorKind::Connectivity,
                _ => ErrorKind::Protocol,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
