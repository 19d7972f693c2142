use fileutil::ZipOptions;

mod common;

#[tokio::test]
async fn zip_crate_reads_our_archives() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    common::write_tree(
        &src,
        &[("a.txt", b"hello"), ("sub/b.txt", b"world"), ("sub/caf\u{e9}.txt", b"utf-8")],
    );

    for options in [ZipOptions::stored(), ZipOptions::default()] {
        let archive = tmp.path().join("ours.zip");
        fileutil::zip_dir_with(&src, &archive, &options).await.unwrap();

        let entries = common::read_foreign_zip(&archive);
        assert_eq!(
            entries,
            [
                ("a.txt".to_string(), b"hello".to_vec()),
                ("sub/b.txt".to_string(), b"world".to_vec()),
                ("sub/caf\u{e9}.txt".to_string(), b"utf-8".to_vec()),
            ]
        );
    }
}

#[tokio::test]
async fn we_extract_zip_crate_archives() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("foreign.zip");
    let out = tmp.path().join("out");
    std::fs::create_dir(&out).unwrap();
    let big = "0123456789".repeat(50_000);
    common::write_foreign_zip(
        &archive,
        &[("one.txt", b"1"), ("nested/dir/big.txt", big.as_bytes()), ("blank", b"")],
    );

    let entries = fileutil::list_archive(&archive).await.unwrap();
    assert_eq!(entries.len(), 3);

    fileutil::unzip_file(&archive, &out).await.unwrap();

    let tree = common::read_tree(&out);
    assert_eq!(tree["one.txt"], b"1");
    assert_eq!(tree["nested/dir/big.txt"], big.as_bytes());
    assert!(tree["blank"].is_empty());
}

#[tokio::test]
async fn we_read_zip64_archives_with_many_entries() {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const ENTRIES: usize = 70_000;

    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("many.zip");
    let out = tmp.path().join("out");
    std::fs::create_dir(&out).unwrap();

    let mut writer = zip::ZipWriter::new(std::fs::File::create(&archive).unwrap());
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .large_file(true);
    for i in 0..ENTRIES {
        writer
            .start_file(format!("{:02}/{:05}.txt", i / 1000, i), options)
            .unwrap();
        write!(writer, "entry {i}").unwrap();
    }
    writer.finish().unwrap();

    let entries = fileutil::list_archive(&archive).await.unwrap();
    assert_eq!(entries.len(), ENTRIES);
    assert_eq!(entries[0].file_name, "00/00000.txt");
    assert_eq!(entries[ENTRIES - 1].file_name, "69/69999.txt");
    assert_eq!(entries[ENTRIES - 1].uncompressed_size, "entry 69999".len() as u64);

    fileutil::unzip_file(&archive, &out).await.unwrap();

    for i in [0, 65_535, 65_536, ENTRIES - 1] {
        let path = out.join(format!("{:02}", i / 1000)).join(format!("{i:05}.txt"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), format!("entry {i}"));
    }
}
