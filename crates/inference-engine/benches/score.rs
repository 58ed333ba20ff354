use criterion::{black_box, criterion_group, criterion_main, Criterion};
use data_validator::{Gender, RawTransaction, Transaction, Validator};
use feature_engine::{BinaryEncoder, FeaturePipeline, StandardScaler};
use inference_engine::{GradientBoostedModel, RegressionTree, ServingContext, TreeNode};

const CATEGORIES: [&str; 4] = ["grocery_pos", "travel", "home", "misc_net"];
const STATES: [&str; 5] = ["NY", "CA", "TX", "FL", "IL"];
const JOBS: [&str; 5] = ["Engineer", "Doctor", "Teacher", "Artist", "Manager"];

fn training_set() -> Vec<Transaction> {
    (0..1000u32)
        .map(|i| Transaction {
            amt: 1.0 + (i * 37 % 1000) as f64,
            category: CATEGORIES[i as usize % CATEGORIES.len()].to_string(),
            gender: if i % 2 == 0 { Gender::Male } else { Gender::Female },
            state: STATES[i as usize % STATES.len()].to_string(),
            job: JOBS[i as usize % JOBS.len()].to_string(),
            age: 20 + i % 50,
            hour: (i % 24) as u8,
            merchant: Some(format!("merchant_{}", i)),
            hour_category: None,
        })
        .collect()
}

fn context() -> ServingContext {
    let (pipeline, _) = FeaturePipeline::fit(
        &training_set(),
        &BinaryEncoder::default(),
        &StandardScaler::default(),
    )
    .unwrap();
    let n = pipeline.schema().len();

    // 100 depth-one trees spread across the features
    let trees = (0..100)
        .map(|i| {
            RegressionTree::new(vec![
                TreeNode::Split {
                    feature: i % n,
                    threshold: 0.5,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: -0.01 },
                TreeNode::Leaf { value: 0.01 },
            ])
            .unwrap()
        })
        .collect();
    let model = GradientBoostedModel::new(n, 0.0, trees).unwrap();
    ServingContext::new(Validator::default(), pipeline, model).unwrap()
}

fn bench_score(c: &mut Criterion) {
    let context = context();
    let raw = RawTransaction {
        amt: Some(500.0),
        category: Some("travel".to_string()),
        gender: Some("F".to_string()),
        state: Some("CA".to_string()),
        job: Some("Engineer".to_string()),
        age: Some(34.0),
        hour: Some(2.0),
        merchant: None,
        hour_category: None,
    };

    c.bench_function("score_transaction", |b| {
        b.iter(|| context.score(black_box(&raw)).unwrap())
    });
    c.bench_function("transform_features", |b| {
        b.iter(|| context.features(black_box(&raw)).unwrap())
    });
}

criterion_group!(benches, bench_score);
criterion_main!(benches);
