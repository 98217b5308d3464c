use crm::{BulkResponse, DirectoryError};

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Erply error {code}{}", field_suffix(.field))]
    Api {
        code: i64,
        field: Option<String>,
        response: Option<Box<BulkResponse>>,
    },

    #[error("session could not be established: {0}")]
    Authentication(String),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

fn field_suffix(field: &Option<String>) -> String {
    field
        .as_deref()
        .map(|f| format!(" (field {f})"))
        .unwrap_or_default()
}

impl From<ClientError> for DirectoryError {
    fn from(err: ClientError) -> Self {
        let message = err.to_string();
        match err {
            ClientError::Http(_) => DirectoryError::Transport(message),
            ClientError::Api {
                code,
                field,
                response,
            } => DirectoryError::Api {
                code,
                message,
                field,
                response,
            },
            ClientError::Authentication(reason) => DirectoryError::Authentication(reason),
            ClientError::Decode(_) => DirectoryError::Decode(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message_includes_code_and_field() {
        let err = ClientError::Api {
            code: 1011,
            field: Some("customerID".into()),
            response: None,
        };
        assert_eq!(err.to_string(), "Erply error 1011 (field customerID)");

        let err = ClientError::Api {
            code: 1002,
            field: None,
            response: None,
        };
        assert_eq!(err.to_string(), "Erply error 1002");
    }

    #[test]
    fn test_conversion_keeps_code() {
        let err: DirectoryError = ClientError::Api {
            code: 1011,
            field: None,
            response: None,
        }
        .into();
        assert!(err.is_already_deleted());
        assert!(err.to_string().contains("1011"));
    }
}
