//! Tests for FTP reply classification

use ftp_rs::Response;

fn reply(code: u16, message: &str) -> Response {
    Response {
        code,
        message: message.to_string(),
        lines: vec![],
    }
}

#[test]
fn test_preliminary_class() {
    let response = reply(150, "Opening data connection");
    assert!(response.is_preliminary());
    assert!(!response.is_positive());
    assert!(!response.is_intermediate());
}

#[test]
fn test_positive_class() {
    let response = reply(226, "Transfer complete");
    assert!(response.is_positive());
    assert!(!response.is_preliminary());
    assert!(!response.is_transient_negative());
}

#[test]
fn test_intermediate_class() {
    let response = reply(350, "Restarting at 1024");
    assert!(response.is_intermediate());
    assert!(!response.is_positive());
}

#[test]
fn test_transient_negative_class() {
    let response = reply(425, "Can't open data connection");
    assert!(response.is_transient_negative());
    assert!(!response.is_permanent_negative());
}

#[test]
fn test_permanent_negative_class() {
    let response = reply(550, "No such file");
    assert!(response.is_permanent_negative());
    assert!(!response.is_transient_negative());
}

#[test]
fn test_class_boundaries() {
    assert!(reply(100, "").is_preliminary());
    assert!(reply(199, "").is_preliminary());
    assert!(!reply(200, "").is_preliminary());
    assert!(reply(200, "").is_positive());
    assert!(reply(299, "").is_positive());
    assert!(reply(300, "").is_intermediate());
    assert!(reply(399, "").is_intermediate());
    assert!(reply(400, "").is_transient_negative());
    assert!(reply(499, "").is_transient_negative());
    assert!(reply(500, "").is_permanent_negative());
    assert!(reply(599, "").is_permanent_negative());
}

#[test]
fn test_well_known_codes() {
    use ftp_rs::codes;

    assert_eq!(codes::READY, 220);
    assert_eq!(codes::CLOSING_DATA_CONNECTION, 226);
    assert_eq!(codes::PASSIVE_MODE, 227);
    assert_eq!(codes::EXTENDED_PASSIVE_MODE, 229);
    assert_eq!(codes::LOGGED_IN, 230);
    assert_eq!(codes::NEED_PASSWORD, 331);
    assert_eq!(codes::FILE_ACTION_PENDING, 350);
    assert_eq!(codes::NOT_LOGGED_IN, 530);
}
