use criterion::{Criterion, criterion_group, criterion_main};
use mod_persistence::codec::{HybridCodec, PdataCodec};
use mod_persistence::parse::{DefinitionParser, JsonDefinitionParser};
use mod_persistence::pdata_value::{ObjectMap, PdataValue};
use mod_persistence::pdiff::{apply, build_effective_schema, extract};
use mod_persistence::types::{DeltaRecord, Document, Schema, SchemaDiff};
use std::hint::black_box;

// ─── Test Data ──────────────────────────────────────────────────────────────

/// 40 scalar members, a fixed 64-slot array and two arrays sized by enums.
fn base_text() -> String {
    let mut members: Vec<String> = (0..40)
        .map(|i| format!(r#"{{"name": "stat{i}", "type": "int"}}"#))
        .collect();
    members.push(r#"{"name": "xp", "type": "int", "arraySize": 64}"#.to_string());
    members.push(r#"{"name": "unlocked", "type": "bool", "arraySize": "gameModes"}"#.to_string());
    members.push(r#"{"name": "pilotWeapons", "type": "asset", "arraySize": "Slot"}"#.to_string());
    format!(
        r#"{{"members": [{}], "enums": {{"gameModes": ["tdm", "ctf", "ps", "lts"], "Slot": ["head", "chest", "legs", "arms"]}}}}"#,
        members.join(",")
    )
}

/// Eight mods, each adding a game mode and a couple of members.
fn pdiff_texts() -> Vec<String> {
    (0..8)
        .map(|i| {
            format!(
                r#"{{
                    "members": [
                        {{"name": "mod{i}Flag", "type": "int"}},
                        {{"name": "mod{i}Loadout", "type": "int", "arraySize": 16}},
                        {{"name": "unlocked", "type": "bool", "arraySize": "gameModes"}}
                    ],
                    "enumAdds": {{"gameModes": ["mode{i}"]}}
                }}"#
            )
        })
        .collect()
}

struct Fixture {
    base: Schema,
    diffs: Vec<SchemaDiff>,
    effective: Schema,
    full: Document,
    baseline: Document,
}

fn fixture() -> Fixture {
    let parser = JsonDefinitionParser;
    let base = parser.parse_schema(&base_text()).unwrap();
    let diffs: Vec<SchemaDiff> = pdiff_texts()
        .iter()
        .map(|t| parser.parse_schema_diff(t).unwrap())
        .collect();
    let effective = build_effective_schema(&base, &diffs).unwrap();

    let zero = HybridCodec.encode(&Document::new(), &effective).unwrap();
    let mut full = HybridCodec.decode(&zero, &effective).unwrap();
    for i in 0..8 {
        full.get_mut(&format!("mod{i}Flag")).unwrap().value = PdataValue::from(i as i64);
    }
    let baseline_buf = HybridCodec.encode(&Document::new(), &base).unwrap();
    let baseline = HybridCodec.decode(&baseline_buf, &base).unwrap();

    Fixture {
        base,
        diffs,
        effective,
        full,
        baseline,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Group 1: Schema combination
// ═══════════════════════════════════════════════════════════════════════════

fn bench_combine(c: &mut Criterion) {
    let mut group = c.benchmark_group("combine");
    let f = fixture();

    group.bench_function("build_effective_schema (8 pdiffs)", |b| {
        b.iter(|| build_effective_schema(black_box(&f.base), black_box(&f.diffs)).unwrap())
    });

    let texts = pdiff_texts();
    group.bench_function("parse_schema_diff", |b| {
        b.iter(|| JsonDefinitionParser.parse_schema_diff(black_box(&texts[0])).unwrap())
    });

    group.finish();
}

// ═══════════════════════════════════════════════════════════════════════════
// Group 2: Extraction and application
// ═══════════════════════════════════════════════════════════════════════════

fn bench_splice(c: &mut Criterion) {
    let mut group = c.benchmark_group("splice");
    let f = fixture();

    group.bench_function("extract", |b| {
        b.iter(|| extract(black_box(&f.full), black_box(&f.diffs)).unwrap())
    });

    let deltas = extract(&f.full, &f.diffs).unwrap();
    let paired: Vec<(SchemaDiff, DeltaRecord)> = f
        .diffs
        .iter()
        .map(|d| (d.clone(), deltas.get(&d.fingerprint).cloned().unwrap_or_default()))
        .collect();
    group.bench_function("apply (dense)", |b| {
        b.iter(|| apply(black_box(&f.baseline), black_box(&f.effective), black_box(&paired)).unwrap())
    });

    let sparse: Vec<(SchemaDiff, DeltaRecord)> = f
        .diffs
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let record: DeltaRecord = [(
                "unlocked",
                PdataValue::Object(ObjectMap::from([(format!("mode{i}").into(), PdataValue::from(true))])),
            )]
            .into_iter()
            .collect();
            (d.clone(), record)
        })
        .collect();
    group.bench_function("apply (symbolic sparse)", |b| {
        b.iter(|| apply(black_box(&f.baseline), black_box(&f.effective), black_box(&sparse)).unwrap())
    });

    group.finish();
}

// ═══════════════════════════════════════════════════════════════════════════
// Group 3: Codec
// ═══════════════════════════════════════════════════════════════════════════

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let f = fixture();
    let buf = HybridCodec.encode(&f.full, &f.effective).unwrap();

    group.bench_function("encode", |b| {
        b.iter(|| HybridCodec.encode(black_box(&f.full), black_box(&f.effective)).unwrap())
    });

    group.bench_function("decode", |b| {
        b.iter(|| HybridCodec.decode(black_box(&buf), black_box(&f.effective)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_combine, bench_splice, bench_codec);
criterion_main!(benches);
