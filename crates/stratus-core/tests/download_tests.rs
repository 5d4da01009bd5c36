//! Integration tests for file and directory downloads.

mod common;

use std::io::{Cursor, Read};

use common::{manager, text_file, USER_1};
use stratus_core::{ErrorKind, ResourceError};

#[test]
fn file_download_streams_stored_bytes() {
    let manager = manager();
    manager
        .upload_resources(USER_1, "", vec![text_file("a.txt", "hello world")])
        .expect("Failed to upload");

    let download = manager
        .download_resource(USER_1, "a.txt")
        .expect("Failed to download");
    assert_eq!(download.file_name, "a.txt");
    assert_eq!(download.content_type.as_deref(), Some("text/plain"));
    assert!(!download.body.is_archive());
    assert_eq!(download.body.into_bytes().unwrap(), b"hello world");
}

#[test]
fn download_missing_resource_is_not_found() {
    let manager = manager();
    let err = manager.download_resource(USER_1, "ghost.txt").err().unwrap();
    assert!(matches!(err, ResourceError::NotFound { .. }));
    assert_eq!(err.kind().http_status(), 404);
}

#[test]
fn download_blank_path_is_invalid() {
    let manager = manager();
    let err = manager.download_resource(USER_1, " ").err().unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn directory_download_packages_descendants_as_zip() {
    let manager = manager();
    manager
        .create_directory(USER_1, "docs/")
        .expect("Failed to create directory");
    manager
        .create_directory(USER_1, "docs/sub/")
        .expect("Failed to create nested directory");
    manager
        .upload_resources(USER_1, "docs/", vec![text_file("a.txt", "alpha")])
        .expect("Failed to upload");
    manager
        .upload_resources(USER_1, "docs/sub/", vec![text_file("b.txt", "beta")])
        .expect("Failed to upload");
    // Content outside the directory must not leak into the archive
    manager
        .upload_resources(USER_1, "", vec![text_file("outside.txt", "o")])
        .expect("Failed to upload");

    let download = manager
        .download_resource(USER_1, "docs/")
        .expect("Failed to download directory");
    assert_eq!(download.file_name, "docs.zip");
    assert_eq!(download.content_type.as_deref(), Some("application/zip"));
    assert!(download.body.is_archive());

    let bytes = download.body.into_bytes().unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("Invalid zip payload");

    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["a.txt", "sub/b.txt"]);

    let mut content = String::new();
    archive
        .by_name("a.txt")
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "alpha");

    content.clear();
    archive
        .by_name("sub/b.txt")
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "beta");
}

#[test]
fn empty_directory_downloads_as_empty_zip() {
    let manager = manager();
    manager
        .create_directory(USER_1, "empty/")
        .expect("Failed to create directory");

    let download = manager
        .download_resource(USER_1, "empty/")
        .expect("Failed to download directory");
    assert_eq!(download.file_name, "empty.zip");

    let bytes = download.body.into_bytes().unwrap();
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("Invalid zip payload");
    assert_eq!(archive.len(), 0);
}

#[test]
fn downloaded_binary_payload_is_bitwise_identical() {
    let manager = manager();
    let payload: Vec<u8> = (0..=255u8).cycle().take(70_000).collect();
    manager
        .upload_resources(
            USER_1,
            "",
            vec![stratus_core::UploadFile::new("blob.bin", payload.clone())],
        )
        .expect("Failed to upload");

    let download = manager
        .download_resource(USER_1, "blob.bin")
        .expect("Failed to download");
    // Content type is absent when the upload carried none
    assert_eq!(download.content_type, None);
    assert_eq!(download.body.into_bytes().unwrap(), payload);
}
