//! User-Agent string for listing and archive requests.

/// Product comment identifying what the traffic is for.
const UA_COMMENT: &str = "spec-archive-mirror";

/// Default User-Agent for every request (identifies the tool).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("specfetch/{version} ({UA_COMMENT})")
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_carries_version_and_comment() {
        let ua = default_user_agent();
        assert!(ua.ends_with(&format!("({UA_COMMENT})")));
        assert_eq!(
            env!("CARGO_PKG_VERSION"),
            ua.strip_prefix("specfetch/")
                .and_then(|s| s.split(' ').next())
                .expect("UA has version"),
            "UA must contain crate version"
        );
    }
}
