use contact_relay::form::FormData;
use contact_relay::validation::{Field, validate, validate_form};
use criterion::{Criterion, criterion_group, criterion_main};

fn field_benchmark(c: &mut Criterion) {
    c.bench_function("validate email", |b| {
        b.iter(|| validate(Field::Email, "first.last+tag@mail.example.com"))
    });

    let message = "x".repeat(2000);
    c.bench_function("validate message 2000", |b| {
        b.iter(|| validate(Field::Message, &message))
    });
}

fn form_benchmark(c: &mut Criterion) {
    let data = FormData {
        name: "Jane".into(),
        email: "jane@x.com".into(),
        subject: "Hello there".into(),
        message: "This is a message.".into(),
    };

    c.bench_function("validate form", |b| b.iter(|| validate_form(&data)));
}

criterion_group!(benches, field_benchmark, form_benchmark);
criterion_main!(benches);
