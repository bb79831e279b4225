//! Codec Tests
//!
//! Tests for command and response encoding/decoding.

use std::io::Cursor;

use rowstore::protocol::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, write_command, write_response, Command, Response, Status,
};

// =============================================================================
// Command Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_get() {
    let cmd = Command::Get {
        bucket: "users".to_string(),
        key: b"hello".to_vec(),
    };
    let decoded = decode_command(&encode_command(&cmd)).unwrap();
    assert_eq!(decoded, cmd);
}

#[test]
fn test_encode_decode_set() {
    let cmd = Command::Set {
        bucket: "users".to_string(),
        key: b"mykey".to_vec(),
        value: b"myvalue".to_vec(),
    };
    let decoded = decode_command(&encode_command(&cmd)).unwrap();

    match decoded {
        Command::Set { bucket, key, value } => {
            assert_eq!(bucket, "users");
            assert_eq!(key, b"mykey");
            assert_eq!(value, b"myvalue");
        }
        _ => panic!("Expected SET command"),
    }
}

#[test]
fn test_encode_decode_scan() {
    let cmd = Command::Scan {
        bucket: "logs".to_string(),
        from_key: vec![0x00],
        to_key: vec![0xFF, 0xFF],
    };
    let decoded = decode_command(&encode_command(&cmd)).unwrap();
    assert_eq!(decoded, cmd);
    assert_eq!(decoded.bucket(), Some("logs"));
}

#[test]
fn test_encode_decode_ping() {
    let decoded = decode_command(&encode_command(&Command::Ping)).unwrap();
    assert_eq!(decoded, Command::Ping);
    assert_eq!(decoded.bucket(), None);
}

#[test]
fn test_encode_decode_empty_key_and_value() {
    let cmd = Command::Set {
        bucket: "users".to_string(),
        key: vec![],
        value: vec![],
    };
    let decoded = decode_command(&encode_command(&cmd)).unwrap();
    assert_eq!(decoded, cmd);
}

#[test]
fn test_encode_decode_binary_data() {
    let key: Vec<u8> = (0..=255).collect();
    let value: Vec<u8> = (0..=255).rev().collect();
    let cmd = Command::Set {
        bucket: "bin".to_string(),
        key: key.clone(),
        value: value.clone(),
    };

    match decode_command(&encode_command(&cmd)).unwrap() {
        Command::Set { key: k, value: v, .. } => {
            assert_eq!(k, key);
            assert_eq!(v, value);
        }
        _ => panic!("Expected SET command"),
    }
}

// =============================================================================
// Response Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_response_ok() {
    let resp = Response::ok(Some(b"value".to_vec()));
    let decoded = decode_response(&encode_response(&resp)).unwrap();
    assert_eq!(decoded.status(), Status::Ok);
    assert_eq!(decoded, resp);
}

#[test]
fn test_encode_decode_response_ok_no_payload() {
    let decoded = decode_response(&encode_response(&Response::ok(None))).unwrap();
    assert_eq!(decoded, Response::Ok(None));
}

#[test]
fn test_encode_decode_response_not_found() {
    let decoded = decode_response(&encode_response(&Response::not_found())).unwrap();
    assert_eq!(decoded.status(), Status::NotFound);
}

#[test]
fn test_encode_decode_response_error() {
    let decoded = decode_response(&encode_response(&Response::error("Invalid bucket: logs"))).unwrap();
    match decoded {
        Response::Error(message) => assert_eq!(message, "Invalid bucket: logs"),
        _ => panic!("Expected ERROR response"),
    }
}

#[test]
fn test_encode_decode_response_row() {
    let resp = Response::Row {
        key: vec![5],
        value: b"record".to_vec(),
    };
    let decoded = decode_response(&encode_response(&resp)).unwrap();
    assert_eq!(decoded.status(), Status::Row);
    assert_eq!(decoded, resp);
}

#[test]
fn test_encode_decode_response_end() {
    let decoded = decode_response(&encode_response(&Response::End)).unwrap();
    assert_eq!(decoded, Response::End);
}

// =============================================================================
// Error Handling Tests
// =============================================================================

#[test]
fn test_incomplete_header() {
    let bytes = [0x01, 0x00, 0x00]; // Only 3 bytes, need 5
    let result = decode_command(&bytes);
    assert!(result.unwrap_err().to_string().contains("Incomplete header"));
}

#[test]
fn test_incomplete_payload() {
    // Header says 10 bytes payload, but only 5 provided
    let bytes = [0x01, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00, 0x05, 0x68];
    let result = decode_command(&bytes);
    assert!(result.unwrap_err().to_string().contains("Incomplete"));
}

#[test]
fn test_unknown_command_type() {
    let bytes = [0xFF, 0x00, 0x00, 0x00, 0x00];
    let result = decode_command(&bytes);
    assert!(result.unwrap_err().to_string().contains("Unknown command type"));
}

#[test]
fn test_unknown_response_status() {
    let bytes = [0xFF, 0x00, 0x00, 0x00, 0x00];
    let result = decode_response(&bytes);
    assert!(result.unwrap_err().to_string().contains("Unknown response status"));
}

#[test]
fn test_get_missing_key_field() {
    // GET with a complete bucket field but no key field
    let bytes = [0x01, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x01, b'a'];
    let result = decode_command(&bytes);
    assert!(result.unwrap_err().to_string().contains("missing key length"));
}

#[test]
fn test_scan_trailing_bytes() {
    let mut bytes = encode_command(&Command::Scan {
        bucket: "a".to_string(),
        from_key: vec![1],
        to_key: vec![2],
    });
    bytes.push(0x00);
    bytes[4] += 1; // payload length now covers the extra byte
    let result = decode_command(&bytes);
    assert!(result.unwrap_err().to_string().contains("trailing bytes"));
}

#[test]
fn test_non_utf8_bucket() {
    let bytes = [0x01, 0x00, 0x00, 0x00, 0x09, 0x00, 0x00, 0x00, 0x01, 0xFF, 0x00, 0x00, 0x00, 0x00];
    let result = decode_command(&bytes);
    assert!(result.unwrap_err().to_string().contains("not UTF-8"));
}

#[test]
fn test_ping_with_unexpected_payload() {
    let bytes = [0x04, 0x00, 0x00, 0x00, 0x05, 0x68, 0x65, 0x6C, 0x6C, 0x6F];
    let result = decode_command(&bytes);
    assert!(result.unwrap_err().to_string().contains("unexpected payload"));
}

#[test]
fn test_oversized_payload_rejected() {
    let bytes = [0x01, 0xFF, 0xFF, 0xFF, 0xFF];
    let result = read_command(&mut Cursor::new(bytes.to_vec()));
    assert!(result.unwrap_err().to_string().contains("Payload too large"));
}

// =============================================================================
// Stream I/O Tests
// =============================================================================

#[test]
fn test_stream_write_read_command() {
    let cmd = Command::Set {
        bucket: "users".to_string(),
        key: b"key".to_vec(),
        value: b"value".to_vec(),
    };

    let mut buffer = Vec::new();
    write_command(&mut buffer, &cmd).unwrap();

    let mut cursor = Cursor::new(buffer);
    assert_eq!(read_command(&mut cursor).unwrap(), cmd);
}

#[test]
fn test_stream_multiple_commands() {
    let commands = vec![
        Command::Ping,
        Command::Set {
            bucket: "a".to_string(),
            key: b"k1".to_vec(),
            value: b"v1".to_vec(),
        },
        Command::Get {
            bucket: "a".to_string(),
            key: b"k1".to_vec(),
        },
        Command::Scan {
            bucket: "a".to_string(),
            from_key: b"k0".to_vec(),
            to_key: b"k9".to_vec(),
        },
    ];

    let mut buffer = Vec::new();
    for cmd in &commands {
        write_command(&mut buffer, cmd).unwrap();
    }

    let mut cursor = Cursor::new(buffer);
    for expected in &commands {
        assert_eq!(&read_command(&mut cursor).unwrap(), expected);
    }
}

#[test]
fn test_stream_scan_response_sequence() {
    let responses = vec![
        Response::Row { key: vec![5], value: b"five".to_vec() },
        Response::Row { key: vec![6], value: b"six".to_vec() },
        Response::End,
        Response::not_found(),
        Response::error("oops"),
    ];

    let mut buffer = Vec::new();
    for resp in &responses {
        write_response(&mut buffer, resp).unwrap();
    }

    let mut cursor = Cursor::new(buffer);
    for expected in &responses {
        assert_eq!(&read_response(&mut cursor).unwrap(), expected);
    }
}

#[test]
fn test_stream_eof_is_io_error() {
    let mut cursor = Cursor::new(Vec::new());
    let err = read_command(&mut cursor).unwrap_err();
    assert_eq!(err.io_kind(), Some(std::io::ErrorKind::UnexpectedEof));
}

// =============================================================================
// Wire Format Verification Tests
// =============================================================================

#[test]
fn test_wire_format_get() {
    let cmd = Command::Get {
        bucket: "ab".to_string(),
        key: b"test".to_vec(),
    };
    let encoded = encode_command(&cmd);

    // [0x01][len 14][bucket_len 2][a b][key_len 4][t e s t]
    assert_eq!(encoded[0], 0x01);
    assert_eq!(&encoded[1..5], &[0x00, 0x00, 0x00, 0x0E]);
    assert_eq!(&encoded[5..9], &[0x00, 0x00, 0x00, 0x02]);
    assert_eq!(&encoded[9..11], b"ab");
    assert_eq!(&encoded[11..15], &[0x00, 0x00, 0x00, 0x04]);
    assert_eq!(&encoded[15..19], b"test");
    assert_eq!(encoded.len(), 19);
}

#[test]
fn test_wire_format_response_row() {
    let encoded = encode_response(&Response::Row { key: vec![7], value: b"hi".to_vec() });

    // [0x03][len 7][key_len 1][7][h i]
    assert_eq!(encoded[0], 0x03);
    assert_eq!(&encoded[1..5], &[0x00, 0x00, 0x00, 0x07]);
    assert_eq!(&encoded[5..9], &[0x00, 0x00, 0x00, 0x01]);
    assert_eq!(encoded[9], 7);
    assert_eq!(&encoded[10..12], b"hi");
}
