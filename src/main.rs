use anyhow::Context;
use rdf_algebra::query::algebra::{
    CompareOp, ProjectionElemList, QueryModel, StatementPattern, ValueExpr, Var,
};
use rdf_algebra::query::{BindingSet, CloseableIteration, DefaultEvaluationStrategy, QueryBindingSet};
use rdf_algebra::rdf::{Literal, NamedNode, RdfStore, TermFactory};
use rdf_algebra::{EngineConfig, QueryEngine};

const EX: &str = "http://example.org/";

fn iri(local: &str) -> anyhow::Result<NamedNode> {
    Ok(NamedNode::new(&format!("{}{}", EX, local))?)
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("RDF Algebra Engine v{}", rdf_algebra::version());
    println!("==========================================");
    println!();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_file(&path).with_context(|| format!("loading {}", path))?,
        None => EngineConfig::default(),
    };
    println!("Config: {:?}", config);

    let store = build_store()?;
    println!("✓ Loaded {} statements", store.len());

    let mut model = build_query()?;
    println!("\n=== Query plan ===\n{}", model);

    let engine = QueryEngine::new(config);
    engine.optimize(&mut model)?;
    println!("=== Optimized plan ===\n{}", model);

    let strategy = DefaultEvaluationStrategy::new(&store);
    let mut result = engine.evaluate(&strategy, &model, &QueryBindingSet::new())?;
    println!("=== Results ({}) ===", result.binding_names().join(", "));
    while let Some(row) = result.next()? {
        println!("  {}", row);
        if row.get("age").is_none() {
            println!("    (no age recorded)");
        }
    }
    result.close()?;

    Ok(())
}

fn build_store() -> anyhow::Result<RdfStore> {
    let factory = TermFactory::new();
    let mut store = RdfStore::new();
    let (knows, name, age) = (iri("knows")?, iri("name")?, iri("age")?);

    let people = [("alice", "Alice", Some(34)), ("bob", "Bob", Some(27)), ("carol", "Carol", None)];
    for (id, label, years) in people {
        store.insert(iri(id)?, name.clone(), Literal::new_simple_literal(label))?;
        if let Some(years) = years {
            store.insert(iri(id)?, age.clone(), factory.create_integer(years))?;
        }
    }
    store.insert(iri("alice")?, knows.clone(), iri("bob")?)?;
    store.insert(iri("alice")?, knows.clone(), iri("carol")?)?;
    store.insert(iri("bob")?, knows, iri("carol")?)?;
    Ok(store)
}

/// SELECT ?friend ?age WHERE {
///   ?p :name "Alice" . ?p :knows ?f . ?f :name ?friend
///   OPTIONAL { ?f :age ?age FILTER(?age > 18) }
/// }
fn build_query() -> anyhow::Result<QueryModel> {
    let mut model = QueryModel::new();
    let constant = |name: &str, node: NamedNode| Var::constant(format!("-const-{}", name), node);

    let alice = model.statement_pattern(StatementPattern::new(
        Var::new("p"),
        constant("name", iri("name")?),
        Var::constant("-const-alice", Literal::new_simple_literal("Alice")),
    ))?;
    let knows = model.statement_pattern(StatementPattern::new(
        Var::new("p"),
        constant("knows", iri("knows")?),
        Var::new("f"),
    ))?;
    let friend = model.statement_pattern(StatementPattern::new(
        Var::new("f"),
        constant("name", iri("name")?),
        Var::new("friend"),
    ))?;
    let age = model.statement_pattern(StatementPattern::new(
        Var::new("f"),
        constant("age", iri("age")?),
        Var::new("age"),
    ))?;

    let adult = ValueExpr::compare(
        ValueExpr::var("age"),
        CompareOp::Gt,
        ValueExpr::constant(TermFactory::new().create_integer(18)),
    );

    let chain = model.join(knows, friend)?;
    let chain = model.join(chain, alice)?;
    let optional = model.optional_join(chain, age, Some(adult))?;
    let root = model.projection(optional, ProjectionElemList::of_names(&["friend", "age"]))?;
    model.set_root(root)?;
    Ok(model)
}
