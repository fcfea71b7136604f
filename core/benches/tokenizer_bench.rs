use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::{json, Map, Value};
use specdex_core::tokenizer::tokenize;
use specdex_core::Engine;

const TEXT: &str = "GET /v1/customers/{customerId}/payment_methods | List payment methods \
    | Returns a list of PaymentMethods attached to the Customer | payments customers \
    | operationId: listCustomerPaymentMethods | 200, 400, 404";

fn synthetic_spec(paths: usize) -> Value {
    let mut map = Map::new();
    for i in 0..paths {
        map.insert(
            format!("/resource{i}/items"),
            json!({"get": {"summary": format!("List items of resource {i}"), "operationId": format!("list{i}")}}),
        );
    }
    json!({ "paths": map })
}

fn bench_tokenize(c: &mut Criterion) {
    c.bench_function("tokenize_endpoint", |b| b.iter(|| tokenize(TEXT)));
}

fn bench_search(c: &mut Criterion) {
    let mut engine = Engine::new();
    engine.index_batch(&synthetic_spec(500), "bench");
    c.bench_function("search_500_docs", |b| b.iter(|| engine.search("list items resource", 10, 0.1)));
}

criterion_group!(benches, bench_tokenize, bench_search);
criterion_main!(benches);
