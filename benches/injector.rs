#![allow(dead_code)]

use bindery::{Class, Component, Constructor, Field, Inject, Injector, Method, Property};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

struct Entity {
    id: i32,
    name: String,
}

impl Component for Entity {
    fn class() -> Class<Self> {
        Class::new()
            .constructor(
                Constructor::new(|args| {
                    Ok(Entity {
                        id: args.get(0)?,
                        name: args.get(1)?,
                    })
                })
                .param(Property::parameter::<i32>("id"))
                .param(Property::parameter::<String>("name")),
            )
            .method(
                Method::new("describe", |entity: &mut Entity, args| Ok(format!("{}:{}:{}", entity.id, entity.name, args.get::<i32>(0)?)))
                    .param(Property::parameter::<i32>("suffix")),
            )
    }
}

#[derive(Default)]
struct EntityWithFields {
    id: i32,
    name: String,
}

impl Component for EntityWithFields {
    fn class() -> Class<Self> {
        Class::new()
            .constructor(Constructor::new(|_| Ok(EntityWithFields::default())))
            .field(
                Field::new::<i32>("id", |entity: &mut EntityWithFields, value| {
                    entity.id = value.get()?;
                    Ok(())
                })
                .tag(Inject),
            )
            .field(
                Field::new::<String>("name", |entity: &mut EntityWithFields, value| {
                    entity.name = value.get()?;
                    Ok(())
                })
                .tag(Inject),
            )
    }
}

fn injector() -> Injector {
    Injector::new(|resources| {
        resources.on::<i32>().assign_instance(7);
        resources.on::<String>().assign_supplier(|| String::from("entity"));
    })
}

fn criterion_benchmark(c: &mut Criterion) {
    let injector = injector();
    let constructor = injector.for_constructor::<Entity>().unwrap();
    let fields = injector.for_fields::<EntityWithFields>().unwrap();
    let describe = Entity::class().declared_methods()[0].clone();
    let method = injector.for_method(&describe).unwrap();

    c.bench_function("new_instance", |b| b.iter(|| black_box(injector.new_instance::<Entity>(&[]).unwrap())))
        .bench_function("new_instance_with_injector", |b| b.iter(|| black_box(constructor.new_instance(&[]).unwrap())))
        .bench_function("new_instance_with_fields", |b| {
            b.iter(|| black_box(injector.new_instance_with_fields::<EntityWithFields>(&[]).unwrap()))
        })
        .bench_function("new_instance_with_fields_injector", |b| b.iter(|| black_box(fields.new_instance(&[]).unwrap())))
        .bench_function("invoke_method", |b| {
            let mut entity = constructor.new_instance(&[]).unwrap();
            b.iter(|| black_box(method.invoke(Some(&mut entity), &[]).unwrap()))
        });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
