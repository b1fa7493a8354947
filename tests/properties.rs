//! Property tests for the retrieval, memory and classification invariants

mod common;

use common::ScriptedLlm;
use proptest::prelude::*;
use proptest::sample::subsequence;
use sentinel_rag::analysis::QueryClassifier;
use sentinel_rag::config::{ClassifierConfig, MemoryConfig};
use sentinel_rag::memory::{HyperEdge, HyperGraphMemory};
use sentinel_rag::retrieval::{
    generate_combinations, mask_terms, maskable_terms, rrf_score, suspicion_from_similarities,
};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

const ENTITY_POOL: [&str; 6] = ["Alpha", "Beta", "Gamma", "Delta", "Echo", "Foxtrot"];

fn binomial(n: usize, k: usize) -> usize {
    (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
}

fn entity_set() -> impl Strategy<Value = BTreeSet<String>> {
    subsequence(ENTITY_POOL.to_vec(), 1..=4)
        .prop_map(|names| names.into_iter().map(String::from).collect())
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn prop_combinations_are_unique_and_increasing(n in 1usize..=8, k_seed in 0usize..8) {
        let k = k_seed % n + 1;
        let combos = generate_combinations(n, k);

        prop_assert_eq!(combos.len(), binomial(n, k));
        let unique: HashSet<&Vec<usize>> = combos.iter().collect();
        prop_assert_eq!(unique.len(), combos.len());
        for combo in &combos {
            prop_assert_eq!(combo.len(), k);
            prop_assert!(combo.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(combo.iter().all(|&i| i < n));
        }
    }

    #[test]
    fn prop_rrf_strictly_decreases_with_rank(
        rank in 0usize..1000,
        weight in 0.05f32..1.0,
        k in 1.0f32..100.0,
    ) {
        let better = rrf_score(weight, rank, k);
        let worse = rrf_score(weight, rank + 1, k);
        prop_assert!(better > worse);
        prop_assert!(worse > 0.0);
    }

    #[test]
    fn prop_suspicion_in_unit_range(original in -1.0f32..1.0, masked in -1.0f32..1.0) {
        let score = suspicion_from_similarities(original, masked);
        prop_assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn prop_masking_absent_terms_changes_nothing(words in prop::collection::vec("[a-z]{4,8}", 1..12)) {
        let content = words.join(" ");
        // digits never appear in the generated words
        let terms = maskable_terms("quarter2024 budget7 alloc99", 3);
        prop_assert_eq!(mask_terms(&content, &terms), content);
        prop_assert_eq!(suspicion_from_similarities(0.8, 0.8), 0.0);
    }

    #[test]
    fn prop_merged_edge_arithmetic(
        a_set in entity_set(),
        b_set in entity_set(),
        a_order in 1u32..20,
        b_order in 1u32..20,
        a_conf in 0.0f64..=1.0,
        b_conf in 0.0f64..=1.0,
    ) {
        let mut a = HyperEdge::new("a", "first", a_set.clone());
        a.order = a_order;
        a.confidence = a_conf;
        let mut b = HyperEdge::new("b", "second", b_set.clone());
        b.order = b_order;
        b.confidence = b_conf;

        let merged = HyperEdge::merged("m", &a, &b, "both");
        prop_assert_eq!(merged.order, a_order.max(b_order) + 1);
        prop_assert!((merged.confidence - (a_conf + b_conf) / 2.0).abs() < 1e-12);
        let union: BTreeSet<String> = a_set.union(&b_set).cloned().collect();
        prop_assert_eq!(merged.vertex_ids, union);
    }

    #[test]
    fn prop_merge_removes_exactly_one_edge(a_set in entity_set(), b_set in entity_set()) {
        runtime().block_on(async {
            let memory = HyperGraphMemory::new(Arc::new(ScriptedLlm::offline()), MemoryConfig::default());
            let a = memory.insert_memory_point("s", "first", &a_set, None).await.unwrap();
            let b = memory.insert_memory_point("s", "second", &b_set, None).await.unwrap();
            let before = memory.memory_point_count("s").await;

            let merged = memory.merge_memory_points("s", &a.id, &b.id, "q").await.unwrap();
            assert_eq!(memory.memory_point_count("s").await, before - 1);
            assert_eq!(merged.order, 2);
            assert!((merged.confidence - 1.0).abs() < 1e-12);
        });
    }

    #[test]
    fn prop_consolidation_removes_one_edge_per_pair(
        sets in prop::collection::vec(entity_set(), 1..8),
        threshold in 0.3f64..=1.0,
    ) {
        runtime().block_on(async {
            let config = MemoryConfig {
                merge_similarity_threshold: threshold,
                ..MemoryConfig::default()
            };
            let memory = HyperGraphMemory::new(Arc::new(ScriptedLlm::offline()), config);
            for (i, set) in sets.iter().enumerate() {
                memory
                    .insert_memory_point("s", &format!("fact {}", i), set, None)
                    .await
                    .unwrap();
            }

            let graph = memory.snapshot("s").await.unwrap();
            let pairs = HyperGraphMemory::consolidation_pairs(&graph, threshold);
            let before = graph.edge_count();

            memory.consolidate_memory("s").await;
            let after = memory.memory_point_count("s").await;
            assert_eq!(after, before - pairs.len());

            // nothing left to merge means a second pass is a no-op
            let graph = memory.snapshot("s").await.unwrap();
            if HyperGraphMemory::consolidation_pairs(&graph, threshold).is_empty() {
                memory.consolidate_memory("s").await;
                assert_eq!(memory.memory_point_count("s").await, after);
            }
        });
    }

    #[test]
    fn prop_classifier_is_deterministic(query in "[A-Za-z?\" ]{0,80}") {
        let first = QueryClassifier::new(ClassifierConfig::default()).unwrap();
        let second = QueryClassifier::new(ClassifierConfig::default()).unwrap();

        let a = first.analyze(&query);
        let b = first.analyze(&query);
        let c = second.analyze(&query);
        prop_assert_eq!(a.complexity, b.complexity);
        prop_assert_eq!(&a.entities, &b.entities);
        prop_assert_eq!(a.complexity, c.complexity);
        prop_assert_eq!(&a.entities, &c.entities);
    }
}
