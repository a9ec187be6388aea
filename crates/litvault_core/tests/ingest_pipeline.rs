use litvault_core::db::open_db_in_memory;
use litvault_core::model::collection::{Collection, CollectionId, CollectionSummary};
use litvault_core::model::literature::{LiteratureRecord, NewLiteratureRecord, RecordId};
use litvault_core::repo::collection_store::DuplicateOwner;
use litvault_core::service::ingest_service::ImportFailure;
use litvault_core::{
    CollectionStore, ContentHash, DocumentReader, ExtractionError, ExtractionOracle,
    ImportOutcome, IngestError, IngestService, OracleError, PaperInfo, PdfTextReader,
    PlainTextReader, RepoResult, SqliteCollectionStore,
};
use std::cell::Cell;
use std::path::{Path, PathBuf};

/// Extracts the first line as title; fails on documents starting with `FAIL`.
#[derive(Default)]
struct StubExtractor {
    calls: Cell<usize>,
}

impl ExtractionOracle for StubExtractor {
    fn extract(&self, text: &str) -> Result<PaperInfo, ExtractionError> {
        self.calls.set(self.calls.get() + 1);
        if text.starts_with("FAIL") {
            return Err(ExtractionError::Oracle(OracleError::Api {
                status: 500,
                message: "upstream down".to_string(),
            }));
        }
        let title = text.lines().next().unwrap_or_default().to_string();
        Ok(PaperInfo {
            year: Some(2020),
            journal: "ICLR".to_string(),
            summary: format!("About {title}."),
            title,
            authors: "A. Smith".to_string(),
        })
    }
}

fn write_doc(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), body).unwrap();
}

#[test]
fn distinct_documents_and_renamed_duplicate_yield_two_records() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteCollectionStore::try_new(&conn).unwrap();
    let extractor = StubExtractor::default();
    let service = IngestService::new(&store, PlainTextReader, &extractor);

    let dir = tempfile::tempdir().unwrap();
    write_doc(dir.path(), "a_dqn.pdf", "Playing Atari\nbody one");
    write_doc(dir.path(), "b_ppo.pdf", "Proximal Policy Optimization\nbody two");
    write_doc(dir.path(), "c_copy_of_dqn.pdf", "Playing Atari\nbody one");

    let summary = service.import_directory("RL", dir.path()).unwrap();

    assert_eq!(
        (summary.imported, summary.duplicates, summary.failed),
        (2, 1, 0)
    );
    assert_eq!(extractor.calls.get(), 2);
    let records = store.list_records("RL").unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].title, "Playing Atari");
    assert!(Path::new(&records[0].file_path).is_absolute());
    assert!(records[0].file_path.ends_with("a_dqn.pdf"));

    match &summary.outcomes[2] {
        ImportOutcome::SkippedDuplicate {
            existing_record,
            existing_collection,
            ..
        } => {
            assert_eq!(*existing_record, Some(records[0].id));
            assert_eq!(existing_collection.as_deref(), Some("RL"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn reimporting_directory_changes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteCollectionStore::try_new(&conn).unwrap();
    let extractor = StubExtractor::default();
    let service = IngestService::new(&store, PlainTextReader, &extractor);

    let dir = tempfile::tempdir().unwrap();
    write_doc(dir.path(), "one.pdf", "First paper");
    write_doc(dir.path(), "two.pdf", "Second paper");

    service.import_directory("RL", dir.path()).unwrap();
    let calls_after_first_run = extractor.calls.get();
    let rerun = service.import_directory("RL", dir.path()).unwrap();

    assert_eq!((rerun.imported, rerun.duplicates, rerun.failed), (0, 2, 0));
    assert_eq!(extractor.calls.get(), calls_after_first_run);
    assert_eq!(store.list_records("RL").unwrap().len(), 2);
}

#[test]
fn same_content_in_another_collection_is_skipped() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteCollectionStore::try_new(&conn).unwrap();
    let service = IngestService::new(&store, PlainTextReader, StubExtractor::default());

    let rl_dir = tempfile::tempdir().unwrap();
    let dl_dir = tempfile::tempdir().unwrap();
    write_doc(rl_dir.path(), "paper.pdf", "Shared paper");
    write_doc(dl_dir.path(), "renamed.PDF", "Shared paper");

    service.import_directory("RL", rl_dir.path()).unwrap();
    let summary = service.import_directory("DL", dl_dir.path()).unwrap();

    assert_eq!(summary.duplicates, 1);
    assert!(store.list_records("DL").unwrap().is_empty());
    assert_eq!(store.list_records("RL").unwrap().len(), 1);
}

#[test]
fn extraction_failure_is_counted_and_batch_continues() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteCollectionStore::try_new(&conn).unwrap();
    let service = IngestService::new(&store, PlainTextReader, StubExtractor::default());

    let dir = tempfile::tempdir().unwrap();
    write_doc(dir.path(), "a.pdf", "FAIL on this one");
    write_doc(dir.path(), "b.pdf", "Good paper");
    write_doc(dir.path(), "c.pdf", "   ");

    let summary = service.import_directory("RL", dir.path()).unwrap();

    assert_eq!(
        (summary.imported, summary.duplicates, summary.failed),
        (1, 0, 2)
    );
    assert!(matches!(
        &summary.outcomes[0],
        ImportOutcome::Failed {
            reason: ImportFailure::Extraction(_),
            ..
        }
    ));
    assert!(matches!(
        &summary.outcomes[2],
        ImportOutcome::Failed {
            reason: ImportFailure::Read(_),
            ..
        }
    ));

    // The failed document is picked up by the next run once extraction works.
    write_doc(dir.path(), "a.pdf", "Recovered paper");
    let rerun = service.import_directory("RL", dir.path()).unwrap();
    assert_eq!((rerun.imported, rerun.duplicates), (1, 1));
}

#[test]
fn unrecognized_files_and_subdirectories_are_ignored() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteCollectionStore::try_new(&conn).unwrap();
    let service = IngestService::new(&store, PlainTextReader, StubExtractor::default());

    let dir = tempfile::tempdir().unwrap();
    write_doc(dir.path(), "notes.txt", "Not a pdf");
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    write_doc(&dir.path().join("nested"), "deep.pdf", "Nested paper");

    let summary = service.import_directory("RL", dir.path()).unwrap();
    assert_eq!(summary.total(), 0);
}

#[test]
fn empty_directory_still_creates_collection() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteCollectionStore::try_new(&conn).unwrap();
    let service = IngestService::new(&store, PlainTextReader, StubExtractor::default());
    let dir = tempfile::tempdir().unwrap();

    service.import_directory("DL", dir.path()).unwrap();

    let collections = store.list_collections().unwrap();
    assert_eq!(collections.len(), 1);
    assert_eq!(collections[0].name, "DL");
    assert_eq!(collections[0].record_count, 0);
}

#[test]
fn missing_directory_is_rejected_before_any_work() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteCollectionStore::try_new(&conn).unwrap();
    let service = IngestService::new(&store, PlainTextReader, StubExtractor::default());
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("paper.pdf");
    write_doc(dir.path(), "paper.pdf", "Paper");

    let missing = service
        .import_directory("RL", &dir.path().join("absent"))
        .unwrap_err();
    assert!(matches!(missing, IngestError::DirectoryNotFound(_)));
    let not_dir = service.import_directory("RL", &file).unwrap_err();
    assert!(matches!(not_dir, IngestError::NotADirectory(_)));
    assert!(store.list_collections().unwrap().is_empty());
}

#[test]
fn single_file_import_and_missing_file() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteCollectionStore::try_new(&conn).unwrap();
    let service = IngestService::new(&store, PlainTextReader, StubExtractor::default());
    let dir = tempfile::tempdir().unwrap();
    write_doc(dir.path(), "paper.pdf", "Lone paper");

    let summary = service
        .import_file("RL", &dir.path().join("paper.pdf"))
        .unwrap();
    assert_eq!(summary.imported, 1);
    assert!(matches!(
        &summary.outcomes[0],
        ImportOutcome::Imported { title, .. } if title == "Lone paper"
    ));

    let err = service
        .import_file("RL", &dir.path().join("absent.pdf"))
        .unwrap_err();
    assert!(matches!(err, IngestError::FileNotFound(_)));
}

/// Store whose hash lookups never find anything, so duplicates only surface on insert.
struct BlindLookupStore<'conn> {
    inner: SqliteCollectionStore<'conn>,
}

impl CollectionStore for BlindLookupStore<'_> {
    fn get_or_create_collection(&self, name: &str) -> RepoResult<CollectionId> {
        self.inner.get_or_create_collection(name)
    }

    fn find_collection(&self, name: &str) -> RepoResult<Option<Collection>> {
        self.inner.find_collection(name)
    }

    fn find_record_by_hash(&self, _hash: &ContentHash) -> RepoResult<Option<RecordId>> {
        Ok(None)
    }

    fn find_duplicate_owner(&self, _hash: &ContentHash) -> RepoResult<Option<DuplicateOwner>> {
        Ok(None)
    }

    fn insert_record(&self, record: &NewLiteratureRecord) -> RepoResult<RecordId> {
        self.inner.insert_record(record)
    }

    fn list_records(&self, collection_name: &str) -> RepoResult<Vec<LiteratureRecord>> {
        self.inner.list_records(collection_name)
    }

    fn list_collections(&self) -> RepoResult<Vec<CollectionSummary>> {
        self.inner.list_collections()
    }
}

#[test]
fn duplicate_rejected_at_insert_is_a_benign_skip() {
    let conn = open_db_in_memory().unwrap();
    let store = BlindLookupStore {
        inner: SqliteCollectionStore::try_new(&conn).unwrap(),
    };
    let service = IngestService::new(&store, PlainTextReader, StubExtractor::default());

    let dir = tempfile::tempdir().unwrap();
    write_doc(dir.path(), "a.pdf", "same");
    write_doc(dir.path(), "b.pdf", "same");

    let summary = service.import_directory("RL", dir.path()).unwrap();

    assert_eq!(
        (summary.imported, summary.duplicates, summary.failed),
        (1, 1, 0)
    );
    assert!(matches!(
        &summary.outcomes[1],
        ImportOutcome::SkippedDuplicate {
            existing_record: Some(1),
            existing_collection: None,
            ..
        }
    ));
    assert_eq!(store.list_records("RL").unwrap().len(), 1);
}

fn fixture_pdf() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("rl_survey.pdf")
}

#[test]
fn pdf_reader_extracts_text_from_fixture() {
    let text = PdfTextReader.read_text(&fixture_pdf()).unwrap();

    assert!(text.contains("Reinforcement"), "unexpected text: {text}");
    assert!(text.contains("gradients"), "unexpected text: {text}");
    assert_eq!(text, text.trim());
}

#[test]
fn renamed_pdf_copy_is_deduplicated_through_pdf_reader() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteCollectionStore::try_new(&conn).unwrap();
    let extractor = StubExtractor::default();
    let service = IngestService::new(&store, PdfTextReader, &extractor);

    let dir = tempfile::tempdir().unwrap();
    std::fs::copy(fixture_pdf(), dir.path().join("survey.pdf")).unwrap();
    std::fs::copy(fixture_pdf(), dir.path().join("survey_renamed.PDF")).unwrap();

    let summary = service.import_directory("RL", dir.path()).unwrap();

    assert_eq!(
        (summary.imported, summary.duplicates, summary.failed),
        (1, 1, 0)
    );
    assert_eq!(extractor.calls.get(), 1);
    assert_eq!(store.list_records("RL").unwrap().len(), 1);
}
