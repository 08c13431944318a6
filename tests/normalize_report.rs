// tests/normalize_report.rs
use serde_json::json;
use supplier_match::criteria::{consolidate, AnswerSet, ConsolidatedCharacteristic};
use supplier_match::matching::normalize::normalize_product;
use supplier_match::matching::{
    normalize, normalize_response, MatchStatus, MatchingCharacteristic, MatchingProduct,
    MatchingResponse,
};
use supplier_match::Registry;

fn registry() -> Registry {
    Registry::from_json_str(
        &json!([
            {"id": 10, "nom": "Type de nacelle", "type": "Textuelle",
             "valeurs": [{"id": 5, "valeur": "Ciseaux"}, {"id": 6, "valeur": "Articulée"}, {"id": 7, "valeur": "Télescopique"}]},
            {"id": 20, "nom": "Hauteur de travail", "unite": "m", "type": "Numérique", "valeurs": []},
            {"id": 30, "nom": "Énergie", "type": "Textuelle",
             "valeurs": [{"id": 1, "valeur": "Électrique"}, {"id": 2, "valeur": "Diesel"}]}
        ])
        .to_string(),
    )
    .unwrap()
}

fn requirements() -> Vec<ConsolidatedCharacteristic> {
    let set: AnswerSet = serde_json::from_value(json!({
        "Q1": [{"id_caracteristique": 10, "poids": "Critique", "valeurs_cibles": [5]}],
        "Q2": [{"id_caracteristique": 20, "unite": "m", "valeurs_cibles": {"min": 12}}],
        "Q3": [{"id_caracteristique": 30, "valeurs_cibles": [1]}]
    }))
    .unwrap();
    consolidate(&set)
}

#[test]
fn one_spec_per_requirement_even_when_product_is_silent() {
    let reg = registry();
    let reqs = requirements();
    let p1 = MatchingProduct::new("P1", 0.9, 1)
        .with_characteristic(MatchingCharacteristic::new(10, MatchStatus::Match, vec![5]));

    let out = normalize_product(&p1, &reg, &reqs);
    assert_eq!(out.specs.len(), reqs.len());

    let nacelle = &out.specs[0];
    assert_eq!(nacelle.characteristic_id, 10);
    assert_eq!(nacelle.label, "Type de nacelle");
    assert_eq!(nacelle.value, "Ciseaux");
    assert!(nacelle.matches);
    assert_eq!(nacelle.expected, None);

    let energy = out.specs.iter().find(|s| s.characteristic_id == 30).unwrap();
    assert_eq!(energy.value, "-");
    assert!(!energy.matches);
    assert!(energy.is_requested);
    assert_eq!(energy.expected.as_deref(), Some("Électrique"));

    let height = out.specs.iter().find(|s| s.characteristic_id == 20).unwrap();
    assert_eq!(height.expected.as_deref(), Some("≥12 m"));

    // Nothing reported as non-matching → no gaps.
    assert!(out.gaps.is_empty());
}

#[test]
fn spec_entries_follow_requirement_order_without_duplicates() {
    let reg = registry();
    let reqs = requirements();
    let p = MatchingProduct::new("P", 0.5, 1)
        .with_characteristic(MatchingCharacteristic::new(30, MatchStatus::Match, vec![1]))
        .with_characteristic(MatchingCharacteristic::new(99, MatchStatus::Gap, vec![1]))
        .with_characteristic(MatchingCharacteristic::new(10, MatchStatus::Gap, vec![6]));
    let out = normalize_product(&p, &reg, &reqs);
    let spec_ids: Vec<i64> = out.specs.iter().map(|s| s.characteristic_id).collect();
    let req_ids: Vec<i64> = reqs.iter().map(|r| r.characteristic_id).collect();
    assert_eq!(spec_ids, req_ids);
}

#[test]
fn gap_and_blocking_render_identically() {
    let reg = registry();
    let reqs = requirements();
    let gap = MatchingProduct::new("G", 0.5, 1)
        .with_characteristic(MatchingCharacteristic::new(10, MatchStatus::Gap, vec![6]));
    let blocking = MatchingProduct::new("B", 0.5, 1)
        .with_characteristic(MatchingCharacteristic::new(10, MatchStatus::Blocking, vec![6]));

    let g = normalize_product(&gap, &reg, &reqs);
    let b = normalize_product(&blocking, &reg, &reqs);
    assert_eq!(g.specs, b.specs);
    assert_eq!(g.gaps, b.gaps);

    assert!(!g.specs[0].matches);
    assert_eq!(g.specs[0].value, "Articulée");
    assert_eq!(g.specs[0].expected.as_deref(), Some("Ciseaux"));
    assert_eq!(g.gaps, vec!["Type de nacelle : Articulée (demandé Ciseaux)".to_string()]);
}

#[test]
fn gap_lines_cover_product_characteristics_only() {
    let reg = registry();
    let reqs = requirements();
    let mut height = MatchingCharacteristic::new(20, MatchStatus::Gap, vec![]);
    height.value = Some(10.0);
    let p = MatchingProduct::new("P", 0.4, 3)
        .with_characteristic(MatchingCharacteristic::new(30, MatchStatus::NotProvided, vec![]))
        .with_characteristic(height)
        .with_characteristic(MatchingCharacteristic::new(77, MatchStatus::Blocking, vec![3]))
        .with_characteristic(MatchingCharacteristic::new(10, MatchStatus::Match, vec![5]));

    let out = normalize_product(&p, &reg, &reqs);
    assert_eq!(
        out.gaps,
        vec![
            "Énergie : non disponible".to_string(),
            "Hauteur de travail : 10 m (demandé ≥12 m)".to_string(),
            "Characteristic #77 : Value #3".to_string(),
        ]
    );

    let energy = out.specs.iter().find(|s| s.characteristic_id == 30).unwrap();
    assert_eq!(energy.value, "-");
    assert_eq!(energy.expected.as_deref(), Some("Électrique"));
}

#[test]
fn empty_requirements_give_empty_specs_and_structural_gaps() {
    let reg = registry();
    let p = MatchingProduct::new("P", 0.7, 1)
        .with_characteristic(MatchingCharacteristic::new(10, MatchStatus::Gap, vec![7]))
        .with_characteristic(MatchingCharacteristic::new(30, MatchStatus::NotProvided, vec![]));
    let out = normalize_product(&p, &reg, &[]);
    assert!(out.specs.is_empty());
    assert_eq!(
        out.gaps,
        vec![
            "Type de nacelle : Télescopique".to_string(),
            "Énergie : non disponible".to_string(),
        ]
    );
}

#[test]
fn missing_registry_degrades_to_placeholders() {
    let reqs = requirements();
    let p = MatchingProduct::new("P", 0.7, 1)
        .with_characteristic(MatchingCharacteristic::new(10, MatchStatus::Gap, vec![6]));
    let out = normalize_product(&p, &Registry::default(), &reqs);
    assert_eq!(out.specs[0].label, "Characteristic #10");
    assert_eq!(out.specs[0].value, "Value #6");
    assert_eq!(out.specs[0].expected.as_deref(), Some("Value #5"));
    // Unit still comes from the requirement itself.
    let height = out.specs.iter().find(|s| s.characteristic_id == 20).unwrap();
    assert_eq!(height.expected.as_deref(), Some("≥12 m"));
}

#[test]
fn partitions_follow_input_lists_and_sort_by_score() {
    let reg = registry();
    let reqs = requirements();
    let top = vec![
        MatchingProduct::new("t-low", 0.61, 2),
        MatchingProduct::new("t-high", 0.855, 1),
    ];
    // A high-scoring product in the "others" list stays there.
    let others = vec![
        MatchingProduct::new("o-a", 0.3, 3),
        MatchingProduct::new("o-b", 0.99, 4).top_pick(),
        MatchingProduct::new("o-c", 0.3, 5),
    ];
    let out = normalize(&top, &others, &reg, &reqs);

    let rec: Vec<(&str, u8)> = out.recommended.iter().map(|p| (p.id.as_str(), p.score)).collect();
    assert_eq!(rec, vec![("t-high", 86), ("t-low", 61)]);
    let oth: Vec<&str> = out.others.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(oth, vec!["o-b", "o-a", "o-c"]);
}

#[test]
fn backend_response_normalizes_end_to_end() {
    let response: MatchingResponse = serde_json::from_value(json!({
        "liste_produit": [
            {"rang": 1, "id_produit": "A1", "score": 0.8, "top_produit": true,
             "caracteristique": [{"statut_matching": 1, "id_caracteristique": 10, "id_valeur": [5], "poids": 3}]},
            {"rang": 2, "id_produit": "B2", "score": 0.45, "top_produit": false,
             "caracteristique": [{"statut_matching": 3, "id_caracteristique": 30, "id_valeur": [2], "poids": 1}]}
        ],
        "temps_de_traitement": 0.2,
        "alternative_matching": []
    }))
    .unwrap();
    let out = normalize_response(&response, &registry(), &requirements());
    assert_eq!(out.recommended.len(), 1);
    assert_eq!(out.recommended[0].score, 80);
    assert_eq!(out.others[0].gaps, vec!["Énergie : Diesel (demandé Électrique)".to_string()]);
}
