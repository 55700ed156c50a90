use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rdf_algebra::query::algebra::{CompareOp, NodeId, QueryModel, StatementPattern, ValueExpr, Var};
use rdf_algebra::query::{
    CloseableIteration, DefaultEvaluationStrategy, EvaluationStrategy, QueryBindingSet,
    QueryJoinOptimizer, VarCountCostComparator,
};
use rdf_algebra::rdf::{NamedNode, RdfStore, TermFactory};

fn iri(local: &str) -> NamedNode {
    NamedNode::new(&format!("http://example.org/{}", local)).unwrap()
}

fn build_store(size: usize) -> RdfStore {
    let factory = TermFactory::new();
    let mut store = RdfStore::new();
    for i in 0..size {
        let person = iri(&format!("person{}", i));
        store
            .insert(person.clone(), iri("knows"), iri(&format!("person{}", (i * 7 + 1) % size)))
            .unwrap();
        store
            .insert(person, iri("age"), factory.create_integer((i % 90) as i128))
            .unwrap();
    }
    store
}

/// Left-deep chain of `width` patterns whose free-variable counts decrease
fn chain(model: &mut QueryModel, width: usize) -> NodeId {
    let mut operands = Vec::new();
    for i in 0..width {
        let subject = if i % 3 == 0 {
            Var::constant(format!("-const-s{}", i), iri("person0"))
        } else {
            Var::new(format!("s{}", i))
        };
        let predicate = if i % 2 == 0 {
            Var::constant(format!("-const-p{}", i), iri("knows"))
        } else {
            Var::new(format!("p{}", i))
        };
        let pattern = StatementPattern::new(subject, predicate, Var::new(format!("o{}", i)));
        operands.push(model.statement_pattern(pattern).unwrap());
    }
    let mut root = operands[0];
    for &operand in &operands[1..] {
        root = model.join(root, operand).unwrap();
    }
    root
}

/// Benchmark join chain reordering
fn bench_join_optimizer(c: &mut Criterion) {
    let mut group = c.benchmark_group("join_optimizer");

    for width in [4, 16, 64].iter() {
        let mut model = QueryModel::new();
        let root = chain(&mut model, *width);
        model.set_root(root).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(width), width, |b, _| {
            b.iter(|| {
                let mut model = model.clone();
                QueryJoinOptimizer::new(&VarCountCostComparator)
                    .optimize(&mut model)
                    .unwrap()
            });
        });
    }
    group.finish();
}

/// Benchmark a join followed by a filter
fn bench_join_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("join_filter");

    for size in [100, 1000].iter() {
        let store = build_store(*size);
        let mut model = QueryModel::new();
        let knows = model
            .statement_pattern(StatementPattern::new(
                Var::new("a"),
                Var::constant("-const-knows", iri("knows")),
                Var::new("b"),
            ))
            .unwrap();
        let age = model
            .statement_pattern(StatementPattern::new(
                Var::new("b"),
                Var::constant("-const-age", iri("age")),
                Var::new("years"),
            ))
            .unwrap();
        let join = model.join(knows, age).unwrap();
        let adult = ValueExpr::compare(
            ValueExpr::var("years"),
            CompareOp::Ge,
            ValueExpr::constant(TermFactory::new().create_integer(18)),
        );
        let root = model.selection(join, adult).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            let strategy = DefaultEvaluationStrategy::new(&store);
            b.iter(|| {
                strategy
                    .evaluate(&model, root, &QueryBindingSet::new())
                    .unwrap()
                    .collect_all()
                    .unwrap()
                    .len()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_join_optimizer, bench_join_filter,);
criterion_main!(benches);
