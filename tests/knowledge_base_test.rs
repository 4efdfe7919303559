use jarvis::knowledge::KnowledgeBase;
use jarvis::models::Intent;
use jarvis::KnowledgeError;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tempfile::TempDir;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn write_source(dir: &TempDir, name: &str, json: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, json).unwrap();
    path
}

fn sample_kb() -> KnowledgeBase {
    KnowledgeBase::from_intents(vec![
        (
            "saudacao".to_string(),
            Intent::new(["bom dia", "boa tarde", "olá"], ["Olá!"]),
        ),
        (
            "despedida".to_string(),
            Intent::new(["tchau", "até logo"], ["Até logo!"]),
        ),
    ])
}

#[test]
fn test_load_merges_sources_in_order() {
    let dir = TempDir::new().unwrap();
    let first = write_source(
        &dir,
        "a.json",
        r#"{
            "intencoes": {
                "saudacao": { "padroes": ["Oi", "bom dia"], "respostas": ["Olá!"] }
            },
            "entidades": { "tempo": ["hoje"] }
        }"#,
    );
    let second = write_source(
        &dir,
        "b.json",
        r#"{
            "intencoes": {
                "saudacao": { "padroes": ["bom dia", "boa noite"], "respostas": ["Olá!", "Oi!"] },
                "despedida": { "padroes": ["tchau"], "respostas": ["Até logo!"] }
            },
            "entidades": { "tempo": ["hoje", "amanhã"] }
        }"#,
    );

    let kb = KnowledgeBase::load(&[first, second]).unwrap();

    assert_eq!(kb.intent_names(), vec!["saudacao", "despedida"]);
    assert_eq!(kb.find_patterns("saudacao"), strings(&["oi", "bom dia", "boa noite"]));
    assert_eq!(kb.find_responses("saudacao"), strings(&["Olá!", "Oi!"]));
    assert_eq!(kb.pattern_count(), 4);

    let tempo: Vec<String> = kb.entities()["tempo"].iter().cloned().collect();
    assert_eq!(tempo, strings(&["hoje", "amanhã"]));
}

#[test]
fn test_load_unwraps_content_key() {
    let dir = TempDir::new().unwrap();
    let path = write_source(
        &dir,
        "wrapped.json",
        r#"{ "content": { "intencoes": {
            "ajuda": { "padroes": ["socorro"], "respostas": ["Estou aqui."] }
        } } }"#,
    );

    let kb = KnowledgeBase::load(&[path]).unwrap();
    assert_eq!(kb.find_responses("ajuda"), strings(&["Estou aqui."]));
}

#[test]
fn test_missing_source_aborts_load() {
    let dir = TempDir::new().unwrap();
    let good = write_source(
        &dir,
        "good.json",
        r#"{ "intencoes": { "ajuda": { "padroes": ["socorro"], "respostas": ["Estou aqui."] } } }"#,
    );
    let missing = dir.path().join("missing.json");

    let err = KnowledgeBase::load(&[good, missing.clone()]).unwrap_err();
    match err {
        KnowledgeError::SourceNotFound(path) => assert_eq!(path, missing),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_malformed_source_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_source(&dir, "broken.json", "{ not json");
    assert!(matches!(
        KnowledgeBase::load(&[path]),
        Err(KnowledgeError::Parse { .. })
    ));
}

#[test]
fn test_find_responses_unknown_intent_is_empty() {
    let kb = sample_kb();
    assert!(kb.find_responses("inexistente").is_empty());
    assert!(kb.responses_for_pattern("padrão desconhecido").is_empty());
}

#[test]
fn test_add_intent_rejects_duplicate_names() {
    let kb = sample_kb();

    let added = kb.add_intent(
        "agradecimento",
        &strings(&["Obrigado", "valeu", "obrigado"]),
        &strings(&["De nada!", "De nada!", "Disponha!"]),
    );
    assert!(added);
    assert_eq!(kb.find_responses("agradecimento"), strings(&["De nada!", "Disponha!"]));
    assert_eq!(kb.find_patterns("agradecimento"), strings(&["obrigado", "valeu"]));

    let again = kb.add_intent("agradecimento", &strings(&["brigado"]), &strings(&["Outra."]));
    assert!(!again);
    assert_eq!(kb.find_responses("agradecimento"), strings(&["De nada!", "Disponha!"]));
    assert_eq!(kb.intent_count(), 3);
}

#[test]
fn test_added_patterns_are_searchable() {
    let kb = sample_kb();
    assert_eq!(kb.find_most_similar_pattern("valeu", 0.5), None);

    kb.add_intent("agradecimento", &strings(&["valeu"]), &strings(&["De nada!"]));

    assert_eq!(kb.find_most_similar_pattern("Valeu", 0.5).as_deref(), Some("valeu"));
    assert_eq!(kb.responses_for_pattern("valeu"), strings(&["De nada!"]));
}

#[test]
fn test_update_responses() {
    let kb = sample_kb();
    assert!(kb.update_responses("despedida", &strings(&["Tchau!", "Até mais!"])));
    assert_eq!(kb.find_responses("despedida"), strings(&["Tchau!", "Até mais!"]));
    assert!(!kb.update_responses("inexistente", &strings(&["x"])));
}

#[test]
fn test_similar_pattern_respects_threshold() {
    let kb = sample_kb();

    assert_eq!(
        kb.find_most_similar_pattern("Bom Dia", 0.5).as_deref(),
        Some("bom dia")
    );
    // shares single words with patterns but no bigram
    assert_eq!(kb.find_most_similar_pattern("boa dia", 0.999), None);
    assert!(kb.find_most_similar_pattern("boa dia", 0.1).is_some());
    assert_eq!(kb.find_most_similar_pattern("xyz abc", 0.5), None);
}

#[test]
fn test_equal_scores_pick_first_pattern() {
    let kb = KnowledgeBase::from_intents(vec![
        ("a".to_string(), Intent::new(["aa bb"], ["A"])),
        ("b".to_string(), Intent::new(["aa cc"], ["B"])),
    ]);
    assert_eq!(kb.find_most_similar_pattern("aa", 0.1).as_deref(), Some("aa bb"));

    let reversed = KnowledgeBase::from_intents(vec![
        ("b".to_string(), Intent::new(["aa cc"], ["B"])),
        ("a".to_string(), Intent::new(["aa bb"], ["A"])),
    ]);
    assert_eq!(
        reversed.find_most_similar_pattern("aa", 0.1).as_deref(),
        Some("aa cc")
    );
}

#[test]
fn test_loaded_file_keeps_document_order() {
    let dir = TempDir::new().unwrap();
    let source = write_source(
        &dir,
        "ordem.json",
        r#"{
            "intencoes": {
                "zeta": { "padroes": ["aa bb"], "respostas": ["Z"] },
                "alfa": { "padroes": ["aa cc"], "respostas": ["A"] }
            },
            "entidades": { "z": ["1"], "a": ["2"] }
        }"#,
    );

    let kb = KnowledgeBase::load(&[source]).unwrap();
    assert_eq!(kb.intent_names(), vec!["zeta", "alfa"]);
    assert_eq!(kb.all_patterns(), strings(&["aa bb", "aa cc"]));
    let entity_names: Vec<String> = kb.entities().keys().cloned().collect();
    assert_eq!(entity_names, strings(&["z", "a"]));
    assert_eq!(kb.find_most_similar_pattern("aa", 0.1).as_deref(), Some("aa bb"));
}

#[test]
fn test_readers_never_see_partial_index() {
    let kb = sample_kb();
    let base = kb.pattern_count();
    let additions = 20;
    let done = AtomicBool::new(false);

    thread::scope(|scope| {
        let readers: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    let mut seen = Vec::new();
                    while !done.load(Ordering::SeqCst) {
                        let found = kb.find_most_similar_pattern("consulta pedido", 0.1);
                        if let Some(pattern) = found {
                            assert!(
                                !kb.responses_for_pattern(&pattern).is_empty(),
                                "pattern '{pattern}' has no responses"
                            );
                        }
                        seen.push(kb.pattern_count());
                    }
                    seen
                })
            })
            .collect();

        for i in 0..additions {
            let added = kb.add_intent(
                &format!("consulta_{i}"),
                &[format!("consulta numero {i}"), format!("pedido {i}")],
                &[format!("Resposta {i}")],
            );
            assert!(added);
        }
        done.store(true, Ordering::SeqCst);

        for reader in readers {
            let seen = reader.join().unwrap();
            for pair in seen.windows(2) {
                assert!(pair[0] <= pair[1]);
            }
            for count in seen {
                assert!(count >= base && count <= base + 2 * additions);
                assert_eq!((count - base) % 2, 0);
            }
        }
    });

    assert_eq!(kb.pattern_count(), base + 2 * additions);
}

#[test]
fn test_empty_knowledge_base_never_matches() {
    let kb = KnowledgeBase::from_intents(Vec::<(String, Intent)>::new());
    assert_eq!(kb.pattern_count(), 0);
    assert_eq!(kb.find_most_similar_pattern("bom dia", 0.0), None);
}

#[test]
fn test_persist_round_trip() {
    let dir = TempDir::new().unwrap();
    let source = write_source(
        &dir,
        "kb.json",
        r#"{
            "intencoes": { "saudacao": { "padroes": ["oi"], "respostas": ["Olá!"] } },
            "entidades": { "tempo": ["hoje"] }
        }"#,
    );

    let kb = KnowledgeBase::load(&[source.clone()]).unwrap();
    kb.add_intent("despedida", &strings(&["tchau"]), &strings(&["Até logo!"]));

    let written = kb.persist(None).unwrap();
    assert_eq!(written, source);

    let reloaded = KnowledgeBase::load(&[written]).unwrap();
    assert_eq!(reloaded.intent_names(), vec!["saudacao", "despedida"]);
    assert_eq!(reloaded.find_responses("despedida"), strings(&["Até logo!"]));
    assert_eq!(reloaded.entities().len(), 1);
}

#[test]
fn test_persist_without_destination_or_source_fails() {
    let kb = sample_kb();
    assert!(matches!(kb.persist(None), Err(KnowledgeError::Persist { .. })));

    let dir = TempDir::new().unwrap();
    let target = dir.path().join("export.json");
    assert_eq!(kb.persist(Some(target.as_path())).unwrap(), target);
    assert!(target.exists());
}
