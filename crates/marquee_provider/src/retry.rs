use marquee_domain::{Error as DomainError, RetryConfig};

use crate::error::Error;

/// Marks `error` as retryable when it carries one of the configured status
/// codes or comes from a transport failure.
pub fn into_retry(error: anyhow::Error, retry_config: &RetryConfig) -> anyhow::Error {
    if let Some(code) = get_req_status_code(&error).or(get_api_status_code(&error))
        && retry_config.retry_status_codes.contains(&code)
    {
        return DomainError::Retryable(error).into();
    }

    if is_req_transport_error(&error) || is_empty_error(&error) {
        return DomainError::Retryable(error).into();
    }

    error
}

fn get_api_status_code(error: &anyhow::Error) -> Option<u16> {
    error.downcast_ref::<Error>().and_then(|error| match error {
        Error::InvalidStatusCode { status, .. } => Some(*status),
        _ => None,
    })
}

fn get_req_status_code(error: &anyhow::Error) -> Option<u16> {
    error
        .downcast_ref::<reqwest::Error>()
        .and_then(|error| error.status())
        .map(|status| status.as_u16())
}

fn is_req_transport_error(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<reqwest::Error>()
        .is_some_and(|e| e.is_timeout() || e.is_connect())
}

fn is_empty_error(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<Error>()
        .is_some_and(|e| matches!(e, Error::EmptyResponse))
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    fn is_retryable(error: anyhow::Error) -> bool {
        error
            .downcast_ref::<DomainError>()
            .is_some_and(|e| matches!(e, DomainError::Retryable(_)))
    }

    fn status(status: u16) -> anyhow::Error {
        Error::InvalidStatusCode { status, message: "boom".to_string() }.into()
    }

    #[test]
    fn test_into_retry_with_matching_status_code() {
        let retry_config = RetryConfig::default().retry_status_codes(vec![429, 500, 503]);
        let actual = into_retry(status(429), &retry_config);
        assert!(is_retryable(actual));
    }

    #[test]
    fn test_into_retry_with_non_matching_status_code() {
        let retry_config = RetryConfig::default().retry_status_codes(vec![429, 500, 503]);
        let actual = into_retry(status(400), &retry_config);
        assert!(!is_retryable(actual));
    }

    #[test]
    fn test_into_retry_with_empty_response() {
        let retry_config = RetryConfig::default().retry_status_codes(vec![]);
        let actual = into_retry(Error::EmptyResponse.into(), &retry_config);
        assert!(is_retryable(actual));
    }

    #[test]
    fn test_into_retry_with_generic_error() {
        let actual = into_retry(anyhow!("no status here"), &RetryConfig::default());
        assert!(!is_retryable(actual));
    }
}
