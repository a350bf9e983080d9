//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use thornvale_gateway::telnet::codec::TelnetCodec;
use thornvale_gateway::telnet::color;

fn mixed_traffic() -> Vec<u8> {
    let mut bytes = Vec::with_capacity(4096);
    // Negotiation burst the way real clients open
    bytes.extend_from_slice(&[255, 251, 31, 255, 251, 24, 255, 253, 3]);
    bytes.extend_from_slice(&[255, 250, 31, 0, 120, 0, 40, 255, 240]);
    while bytes.len() < 4000 {
        bytes.extend_from_slice(b"cast 'cure light' bramble\r\n");
    }
    bytes
}

fn bench_decode(c: &mut Criterion) {
    let traffic = mixed_traffic();

    c.bench_function("decode_mixed_4k", |b| {
        b.iter(|| {
            let mut codec = TelnetCodec::default();
            black_box(codec.decode(black_box(&traffic)))
        })
    });

    c.bench_function("decode_fragmented", |b| {
        b.iter(|| {
            let mut codec = TelnetCodec::default();
            for chunk in traffic.chunks(7) {
                black_box(codec.decode(black_box(chunk)));
            }
        })
    });
}

fn bench_render(c: &mut Criterion) {
    let markup = "&GThe &rthorn&gwood&n stirs. &W[&c120hp &y64mn&W]&n > ".repeat(20);

    c.bench_function("render_markup", |b| {
        b.iter(|| black_box(color::render(black_box(&markup))))
    });
}

criterion_group!(benches, bench_decode, bench_render);
criterion_main!(benches);
