use fileutil::Error;

mod common;

#[tokio::test]
async fn destination_must_be_a_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("archive.zip");
    let not_a_dir = tmp.path().join("notadir");
    common::write_foreign_zip(&archive, &[("a.txt", b"hello")]);
    std::fs::write(&not_a_dir, b"plain file").unwrap();
    let before = common::read_tree(tmp.path());

    let err = fileutil::unzip_file(&archive, &not_a_dir).await.unwrap_err();

    assert!(matches!(err, Error::DestNotDir(ref path) if *path == not_a_dir));
    assert_eq!(err.to_string(), format!("destination is not a directory: '{}'", not_a_dir.display()));
    assert_eq!(common::read_tree(tmp.path()), before);
}

#[tokio::test]
async fn missing_destination_is_a_lookup_error() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("archive.zip");
    common::write_foreign_zip(&archive, &[("a.txt", b"hello")]);

    let err = fileutil::unzip_file(&archive, tmp.path().join("missing"))
        .await
        .unwrap_err();
    match err {
        Error::Lookup { source, .. } => assert_eq!(source.kind(), std::io::ErrorKind::NotFound),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn missing_or_malformed_archive_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    std::fs::create_dir(&out).unwrap();

    let err = fileutil::unzip_file(tmp.path().join("missing.zip"), &out)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Open { .. }));

    let garbage = tmp.path().join("garbage.zip");
    std::fs::write(&garbage, b"this is not a zip archive at all").unwrap();
    let err = fileutil::unzip_file(&garbage, &out).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArchive(_)));

    assert!(common::read_tree(&out).is_empty());
}

#[tokio::test]
async fn traversal_entries_are_refused() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("evil.zip");
    let out = tmp.path().join("out");
    std::fs::create_dir(&out).unwrap();
    common::write_foreign_zip(&archive, &[("ok.txt", b"fine"), ("../evil.txt", b"gotcha")]);

    let err = fileutil::unzip_file(&archive, &out).await.unwrap_err();

    assert!(matches!(err, Error::UnsafeEntryPath(ref name) if name == "../evil.txt"));
    assert!(!tmp.path().join("evil.txt").exists());
    // entries before the failure stay in place
    assert_eq!(std::fs::read(out.join("ok.txt")).unwrap(), b"fine");
}

#[tokio::test]
async fn directory_entries_become_directories() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("dirs.zip");
    let out = tmp.path().join("out");
    std::fs::create_dir(&out).unwrap();
    common::write_foreign_zip(
        &archive,
        &[("empty/", b""), ("full/", b""), ("full/inner.txt", b"inner")],
    );

    fileutil::unzip_file(&archive, &out).await.unwrap();

    assert!(out.join("empty").is_dir());
    assert_eq!(std::fs::read(out.join("full").join("inner.txt")).unwrap(), b"inner");
}

#[tokio::test]
async fn existing_files_are_overwritten() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("a.zip");
    let out = tmp.path().join("out");
    common::write_tree(&out, &[("a.txt", b"a much longer previous content")]);
    common::write_foreign_zip(&archive, &[("a.txt", b"new")]);

    fileutil::unzip_file(&archive, &out).await.unwrap();

    assert_eq!(std::fs::read(out.join("a.txt")).unwrap(), b"new");
}
