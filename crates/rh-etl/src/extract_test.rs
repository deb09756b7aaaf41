use super::*;
use flate2::write::GzEncoder;
use flate2::Compression;
use rh_core::SourceId;
use std::io::Write;
use tempfile::tempdir;

fn ratings_shape() -> Arc<RecordShape> {
    Arc::new(SourceId::TitleRatings.shape(b'\t', "\\N"))
}

fn gzip(content: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

fn write_gz(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, gzip(content)).unwrap();
    path
}

fn drain(extractor: &mut Extractor) -> Vec<Record> {
    let mut all = Vec::new();
    while let Some(chunk) = extractor.next_chunk().unwrap() {
        all.extend(chunk);
    }
    all
}

const HEADER: &str = "tconst\taverageRating\tnumVotes\n";

#[test]
fn test_reads_typed_records() {
    let dir = tempdir().unwrap();
    let path = write_gz(
        dir.path(),
        "title.ratings.tsv.gz",
        &format!("{HEADER}tt0000001\t5.7\t2100\ntt0000002\t\\N\t\\N\n"),
    );

    let mut extractor = Extractor::open(&path, ratings_shape(), ExtractOptions::default()).unwrap();
    let records = drain(&mut extractor);

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].text("tconst"), Some("tt0000001"));
    assert_eq!(records[0].float("averageRating"), Some(5.7));
    assert_eq!(records[0].int("numVotes"), Some(2100));
    assert_eq!(records[0].line(), 1);
    assert!(records[1].get("averageRating").is_absent());
    assert!(records[1].get("numVotes").is_absent());
    assert_eq!(extractor.stats().rows_read, 2);
}

#[test]
fn test_malformed_rows_are_counted_and_skipped() {
    let dir = tempdir().unwrap();
    let path = write_gz(
        dir.path(),
        "title.ratings.tsv.gz",
        &format!("{HEADER}tt0000001\t5.7\ntt0000002\t6.1\t10\textra\ntt0000003\t7.0\t5\n"),
    );

    let mut extractor = Extractor::open(&path, ratings_shape(), ExtractOptions::default()).unwrap();
    let records = drain(&mut extractor);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].text("tconst"), Some("tt0000003"));
    assert_eq!(records[0].line(), 3);
    let stats = extractor.stats();
    assert_eq!(stats.rows_read, 3);
    assert_eq!(stats.malformed, 2);
}

#[test]
fn test_invalid_utf8_is_malformed() {
    let mut bytes = HEADER.as_bytes().to_vec();
    bytes.extend_from_slice(b"tt\xff\xfe\t1.0\t1\ntt0000002\t2.0\t2\n");
    let reader: Box<dyn Read + Send> = Box::new(std::io::Cursor::new(bytes));

    let mut extractor = Extractor::from_reader(
        reader,
        "inline",
        ratings_shape(),
        ExtractOptions::default(),
    )
    .unwrap();
    let records = drain(&mut extractor);

    assert_eq!(records.len(), 1);
    assert_eq!(extractor.stats().malformed, 1);
}

#[test]
fn test_unparseable_numbers_coerce_to_absent() {
    let dir = tempdir().unwrap();
    let path = write_gz(
        dir.path(),
        "title.ratings.tsv.gz",
        &format!("{HEADER}tt0000001\tabc\t12x\n"),
    );

    let mut extractor = Extractor::open(&path, ratings_shape(), ExtractOptions::default()).unwrap();
    let records = drain(&mut extractor);

    assert_eq!(records.len(), 1);
    assert!(records[0].get("averageRating").is_absent());
    assert!(records[0].get("numVotes").is_absent());
    assert_eq!(extractor.stats().coerced, 2);
    assert_eq!(extractor.stats().malformed, 0);
}

#[test]
fn test_limit_and_chunking() {
    let dir = tempdir().unwrap();
    let mut content = HEADER.to_string();
    for i in 1..=1000 {
        content.push_str(&format!("tt{:07}\t7.5\t{}\n", i, i));
    }
    let path = write_gz(dir.path(), "title.ratings.tsv.gz", &content);

    let options = ExtractOptions {
        chunk_rows: 4,
        limit: Some(10),
    };
    let mut extractor = Extractor::open(&path, ratings_shape(), options).unwrap();

    let sizes: Vec<usize> = std::iter::from_fn(|| extractor.next_chunk().unwrap())
        .map(|chunk| chunk.len())
        .collect();
    assert_eq!(sizes, vec![4, 4, 2]);
    assert_eq!(extractor.stats().rows_read, 10);

    let again = Extractor::open(&path, ratings_shape(), options)
        .unwrap()
        .next_chunk()
        .unwrap()
        .unwrap();
    assert_eq!(again[0].text("tconst"), Some("tt0000001"));
}

#[test]
fn test_header_mismatch_is_fatal() {
    let dir = tempdir().unwrap();
    let path = write_gz(
        dir.path(),
        "title.ratings.tsv.gz",
        "tconst\trating\tvotes\ntt0000001\t5.7\t2100\n",
    );

    let err = Extractor::open(&path, ratings_shape(), ExtractOptions::default()).unwrap_err();
    assert!(matches!(err, ExtractError::HeaderMismatch { .. }));
}

#[test]
fn test_empty_file_is_header_mismatch() {
    let dir = tempdir().unwrap();
    let path = write_gz(dir.path(), "title.ratings.tsv.gz", "");
    assert!(matches!(
        preflight(&path, ratings_shape()),
        Err(ExtractError::HeaderMismatch { .. })
    ));
}

#[test]
fn test_missing_file() {
    let dir = tempdir().unwrap();
    let err = preflight(&dir.path().join("title.ratings.tsv.gz"), ratings_shape()).unwrap_err();
    assert!(matches!(err, ExtractError::NotFound { .. }));
}

#[test]
fn test_corrupt_gzip_is_read_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("title.ratings.tsv.gz");
    std::fs::write(&path, b"this is not gzip data at all").unwrap();

    let err = preflight(&path, ratings_shape()).unwrap_err();
    assert!(matches!(err, ExtractError::Read { .. }));
}

#[test]
fn test_multi_member_gzip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("title.ratings.tsv.gz");
    let mut bytes = gzip(&format!("{HEADER}tt0000001\t5.7\t2100\n"));
    bytes.extend(gzip("tt0000002\t6.0\t12\n"));
    std::fs::write(&path, bytes).unwrap();

    let mut extractor = Extractor::open(&path, ratings_shape(), ExtractOptions::default()).unwrap();
    let records = drain(&mut extractor);
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].text("tconst"), Some("tt0000002"));
}

#[test]
fn test_plain_file_and_custom_format() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ratings.csv");
    std::fs::write(&path, "tconst,averageRating,numVotes\ntt0000001,NULL,4\n").unwrap();

    let shape = Arc::new(SourceId::TitleRatings.shape(b',', "NULL"));
    let mut extractor = Extractor::open(&path, shape, ExtractOptions::default()).unwrap();
    let records = drain(&mut extractor);
    assert_eq!(records.len(), 1);
    assert!(records[0].get("averageRating").is_absent());
    assert_eq!(records[0].int("numVotes"), Some(4));
}

#[test]
fn test_quotes_are_literal() {
    let dir = tempdir().unwrap();
    let content = "titleId\tordering\ttitle\tregion\tlanguage\ttypes\tattributes\tisOriginalTitle\n\
                   tt0000001\t1\t\"Carmencita\t\\N\t\\N\t\\N\t\\N\t0\n";
    let path = write_gz(dir.path(), "title.akas.tsv.gz", content);

    let shape = Arc::new(SourceId::TitleAkas.shape(b'\t', "\\N"));
    let mut extractor = Extractor::open(&path, shape, ExtractOptions::default()).unwrap();
    let records = drain(&mut extractor);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].text("title"), Some("\"Carmencita"));
}
