use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use docql::proto::{Datum, Query, Response, ResponseType};
use docql::{TermExt, r};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::time::Duration;

fn sample_document(fields: usize) -> Datum {
    let mut map = BTreeMap::new();
    for i in 0..fields {
        map.insert(format!("field_{i}"), Datum::Str(format!("value_{i}")));
    }
    Datum::Object(map)
}

fn sample_array(len: usize) -> Datum {
    Datum::Array((0..len).map(|i| Datum::Num(i as f64)).collect())
}

fn sample_get_query() -> Query {
    let term = r::table("users").get("u1");
    Query::start(2, term)
}

fn sample_filter_query() -> Query {
    let term = r::table("users").filter(r::expr(true)).limit(20);
    Query::start(2, term)
}

fn sample_insert_query() -> Query {
    let term = r::table("users").insert(sample_document(8));
    Query::start(2, term)
}

fn sample_atom_response() -> Response {
    Response { response_type: ResponseType::SuccessAtom, token: 2, response: vec![sample_document(8)], backtrace: None }
}

fn sample_partial_response(batch_size: usize) -> Response {
    Response {
        response_type: ResponseType::SuccessPartial,
        token: 2,
        response: (0..batch_size).map(|_| sample_document(6)).collect(),
        backtrace: None,
    }
}

fn bench_term_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("term_construction");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("table_get", |b| {
        b.iter(|| black_box(r::table("users").get(black_box("u1"))))
    });

    group.bench_function("table_filter_limit", |b| {
        b.iter(|| black_box(r::table("users").filter(r::expr(true)).limit(black_box(20))))
    });

    group.finish();
}

fn bench_query_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_encode");
    group.measurement_time(Duration::from_secs(10));

    let get_query = sample_get_query();
    group.bench_function("get", |b| {
        b.iter(|| {
            let mut buf = BytesMut::new();
            black_box(&get_query).encode(&mut buf);
            buf
        })
    });

    let filter_query = sample_filter_query();
    group.bench_function("filter_limit", |b| {
        b.iter(|| {
            let mut buf = BytesMut::new();
            black_box(&filter_query).encode(&mut buf);
            buf
        })
    });

    let insert_query = sample_insert_query();
    group.bench_function("insert", |b| {
        b.iter(|| {
            let mut buf = BytesMut::new();
            black_box(&insert_query).encode(&mut buf);
            buf
        })
    });

    group.finish();
}

fn bench_query_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_decode");
    group.measurement_time(Duration::from_secs(10));

    let mut buf = BytesMut::new();
    sample_get_query().encode(&mut buf);
    let encoded = buf.freeze();

    group.bench_function("get", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(encoded.as_ref()));
            Query::decode(&mut cursor).unwrap()
        })
    });

    group.finish();
}

fn bench_response_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("response_roundtrip");
    group.measurement_time(Duration::from_secs(10));

    let atom = sample_atom_response();
    group.bench_function("atom", |b| {
        b.iter(|| {
            let mut buf = BytesMut::new();
            black_box(&atom).encode(&mut buf);
            let mut cursor = Cursor::new(buf.as_ref());
            Response::decode(&mut cursor).unwrap()
        })
    });

    let partial = sample_partial_response(50);
    group.bench_function("partial_batch_50", |b| {
        b.iter(|| {
            let mut buf = BytesMut::new();
            black_box(&partial).encode(&mut buf);
            let mut cursor = Cursor::new(buf.as_ref());
            Response::decode(&mut cursor).unwrap()
        })
    });

    group.finish();
}

fn bench_batch_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_sizes");
    group.measurement_time(Duration::from_secs(10));

    let batch_sizes = [1, 10, 50, 200, 1000];

    for &size in &batch_sizes {
        let response = sample_partial_response(size);
        let mut buf = BytesMut::new();
        response.encode(&mut buf);
        let encoded = buf.freeze();

        group.bench_with_input(BenchmarkId::new("decode", size), &encoded, |b, encoded| {
            b.iter(|| {
                let mut cursor = Cursor::new(black_box(encoded.as_ref()));
                Response::decode(&mut cursor).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_datum_shapes(c: &mut Criterion) {
    let mut group = c.benchmark_group("datum_shapes");
    group.measurement_time(Duration::from_secs(10));

    let document = sample_document(16);
    group.bench_function("object_16_fields", |b| {
        b.iter(|| {
            let mut buf = BytesMut::new();
            black_box(&document).encode(&mut buf);
            buf
        })
    });

    let array = sample_array(100);
    group.bench_function("array_100_elements", |b| {
        b.iter(|| {
            let mut buf = BytesMut::new();
            black_box(&array).encode(&mut buf);
            buf
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_term_construction,
    bench_query_encode,
    bench_query_decode,
    bench_response_roundtrip,
    bench_batch_sizes,
    bench_datum_shapes,
);
criterion_main!(benches);
