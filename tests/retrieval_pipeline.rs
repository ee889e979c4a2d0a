use std::fs;
use std::sync::Arc;
use std::thread;

use rickover_lib::{
    application::{
        services::{KnowledgeBaseStore, TextEncoder},
        AdvisorService, AskRequest, KnowledgeBaseBuilder, SearchRequest, ServiceConfig,
    },
    domain::{search, Document, DomainError, SearchEngine, SelectionStrategy},
    infrastructure::{FileKnowledgeBaseStore, JsonlCorpusReader, NoOpGenerator, SimpleEmbedEngine},
};
use tempfile::tempdir;

const MODEL: &str = "rickover/simple-hash";

const CORPUS: &str = r#"{"id":"nrc-0001","title":"Reactor Scram","category":"NRC","content":"A scram rapidly inserts all control rods to shut down the reactor."}
{"id":"wiki-0002","title":"Decay heat","category":"Physics","content":"Decay heat continues after shutdown and must be removed by cooling systems."}
{"id":"hist-0003","title":"USS Nautilus","category":"History","content":"Nautilus was the first nuclear powered submarine, launched in 1954."}
{"id":"wiki-0004","title":"Pressurized water reactor","category":"Engineering","content":"The primary loop is kept at high pressure so the coolant does not boil."}
{"id":"nrc-0005","title":"Operator training","category":"NRC","content":"Licensed operators requalify on the simulator and in written examinations."}
{"title":"Empty","content":"   "}
"#;

fn encoder() -> Arc<SimpleEmbedEngine> {
    Arc::new(SimpleEmbedEngine::try_new(MODEL, 128).unwrap())
}

#[test]
fn build_save_load_and_search() {
    let dir = tempdir().unwrap();
    let corpus_path = dir.path().join("corpus.jsonl");
    fs::write(&corpus_path, CORPUS).unwrap();

    let documents = JsonlCorpusReader.read_path(&corpus_path).unwrap();
    assert_eq!(documents.len(), 6);

    let encoder = encoder();
    let built = KnowledgeBaseBuilder::new(encoder.clone(), MODEL)
        .with_batch_size(2)
        .build(documents)
        .unwrap();
    assert_eq!(built.len(), 5, "blank document is dropped");

    let store = FileKnowledgeBaseStore::new(dir.path().join("kb.bin"));
    store.save(&built).unwrap();
    let knowledge_base = Arc::new(store.load().unwrap());
    assert_eq!(knowledge_base.documents(), built.documents());
    assert_eq!(knowledge_base.matrix(), built.matrix());

    let service = AdvisorService::new(
        encoder,
        Arc::new(NoOpGenerator::default()),
        Arc::clone(&knowledge_base),
        ServiceConfig::new(MODEL, 3),
    )
    .unwrap();

    let response = service
        .search(SearchRequest {
            question: "Nautilus was the first nuclear powered submarine, launched in 1954.".into(),
            top_k: None,
        })
        .unwrap();

    assert_eq!(response.total_documents, 5);
    assert_eq!(response.results.len(), 3);
    assert_eq!(response.results[0].id, "hist-0003");
    assert!(response.results[0].score > 0.99);
    for pair in response.results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }

    let health = service.health();
    assert!(health.ok);
    assert_eq!(health.knowledge_base.documents, 5);
}

#[test]
fn answer_without_api_key_reports_generation_error() {
    let encoder = encoder();
    let documents = JsonlCorpusReader.read(CORPUS.as_bytes()).unwrap();
    let knowledge_base = KnowledgeBaseBuilder::new(encoder.clone(), MODEL)
        .build(documents)
        .unwrap();

    let service = AdvisorService::new(
        encoder,
        Arc::new(NoOpGenerator::default()),
        Arc::new(knowledge_base),
        ServiceConfig::default(),
    )
    .unwrap();

    let err = service
        .answer(AskRequest::new("What happens during a scram?"))
        .unwrap_err();
    assert!(matches!(err, DomainError::Generation(_)));
    assert!(err.user_message().starts_with("Error generating response"));
}

#[test]
fn concurrent_searches_match_sequential_results() {
    let encoder = encoder();
    let documents = JsonlCorpusReader.read(CORPUS.as_bytes()).unwrap();
    let knowledge_base = Arc::new(
        KnowledgeBaseBuilder::new(encoder.clone(), MODEL)
            .build(documents)
            .unwrap(),
    );

    let questions = [
        "control rods shut down the reactor",
        "decay heat removal after shutdown",
        "first nuclear submarine",
        "coolant pressure boiling",
        "operator requalification simulator",
    ];
    let queries: Vec<Vec<f32>> = questions
        .iter()
        .map(|q| encoder.encode(MODEL, q).unwrap())
        .collect();

    let expected: Vec<Vec<(usize, f32)>> = queries
        .iter()
        .map(|q| {
            search::search(q, &knowledge_base, 3)
                .unwrap()
                .iter()
                .map(|hit| (hit.index, hit.score))
                .collect()
        })
        .collect();

    thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let kb = Arc::clone(&knowledge_base);
                let queries = &queries;
                scope.spawn(move || {
                    let strategy = if worker % 2 == 0 {
                        SelectionStrategy::FullSort
                    } else {
                        SelectionStrategy::PartialSelect
                    };
                    let engine = SearchEngine::new(strategy);
                    queries
                        .iter()
                        .map(|q| {
                            engine
                                .search(q, &kb, 3)
                                .unwrap()
                                .iter()
                                .map(|hit| (hit.index, hit.score))
                                .collect::<Vec<_>>()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}

#[test]
fn document_whose_tokens_cancel_still_builds_and_ranks() {
    // "w118" and "w200" share a 384-wide bucket with opposite signs.
    let encoder = Arc::new(SimpleEmbedEngine::default());
    let documents = vec![
        Document::new("coolant", "Coolant", "Engineering", "reactor coolant"),
        Document::new("pair", "Pair", "Test", "w118 w200"),
    ];

    let knowledge_base = KnowledgeBaseBuilder::new(encoder.clone(), MODEL)
        .build(documents)
        .unwrap();
    assert_eq!(knowledge_base.len(), 2);

    let query = encoder.encode(MODEL, "w118 w200").unwrap();
    let hits = search::search(&query, &knowledge_base, 1).unwrap();
    assert_eq!(hits[0].document.id, "pair");
    assert!(hits[0].score > 0.99);
}
