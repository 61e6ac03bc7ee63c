// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Table extraction and rule checking over synthetic models

use std::fmt::Write;

use bim45d_core::IfcModel;
use bim45d_processing::ids::{validate, IdsRuleBook};
use bim45d_processing::objects::{model_properties_table, quantities_table};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Storey with `walls` walls, each with one property set and one quantity set
fn synthetic_model(walls: u32) -> String {
    let mut out = String::from(
        "ISO-10303-21;\nHEADER;\nFILE_DESCRIPTION(('ViewDefinition [ReferenceView]'),'2;1');\n\
         FILE_NAME('bench.ifc','2025-01-01T00:00:00',(''),(''),'','','');\n\
         FILE_SCHEMA(('IFC4X3_ADD2'));\nENDSEC;\nDATA;\n\
         #1=IFCPROJECT('0BENCH0000000000000001',$,'Bench',$,$,$,$,$,$);\n\
         #2=IFCBUILDINGSTOREY('0BENCH0000000000000002',$,'Level 0',$,$,$,$,$,.ELEMENT.,0.);\n",
    );
    let mut contained = Vec::with_capacity(walls as usize);
    for i in 0..walls {
        let base = 10 + i * 10;
        let _ = writeln!(out, "#{}=IFCWALL('{:0>22}',$,'W-{}',$,$,$,$,$,$);", base, base, i);
        let _ = writeln!(out, "#{}=IFCPROPERTYSINGLEVALUE('FireRating',$,IFCLABEL('REI {}'),$);", base + 1, 60 + (i % 3) * 30);
        let _ = writeln!(out, "#{}=IFCPROPERTYSET('{:0>22}',$,'Pset_WallCommon',$,(#{}));", base + 2, base + 2, base + 1);
        let _ = writeln!(out, "#{}=IFCRELDEFINESBYPROPERTIES('{:0>22}',$,$,$,(#{}),#{});", base + 3, base + 3, base, base + 2);
        let _ = writeln!(out, "#{}=IFCQUANTITYVOLUME('NetVolume',$,$,{}.5,$);", base + 4, i % 7);
        let _ = writeln!(out, "#{}=IFCELEMENTQUANTITY('{:0>22}',$,'Qto_WallBaseQuantities',$,$,(#{}));", base + 5, base + 5, base + 4);
        let _ = writeln!(out, "#{}=IFCRELDEFINESBYPROPERTIES('{:0>22}',$,$,$,(#{}),#{});", base + 6, base + 6, base, base + 5);
        contained.push(format!("#{}", base));
    }
    let _ = writeln!(
        out,
        "#{}=IFCRELCONTAINEDINSPATIALSTRUCTURE('0BENCH0000000000000003',$,$,$,({}),#2);",
        10 + walls * 10,
        contained.join(",")
    );
    out.push_str("ENDSEC;\nEND-ISO-10303-21;\n");
    out
}

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");
    for walls in [100u32, 1_000] {
        let content = synthetic_model(walls);
        let model = IfcModel::parse(&content).expect("synthetic model parses");

        group.bench_with_input(BenchmarkId::new("properties_table", walls), &model, |b, model| {
            b.iter(|| model_properties_table(black_box(model)))
        });
        group.bench_with_input(BenchmarkId::new("quantities_table", walls), &model, |b, model| {
            b.iter(|| quantities_table(black_box(model)))
        });
    }
    group.finish();
}

fn bench_validation(c: &mut Criterion) {
    let model = IfcModel::parse(&synthetic_model(1_000)).expect("synthetic model parses");
    let mut rules = IdsRuleBook::new();
    rules
        .add("IfcWall", "Pset_WallCommon", "FireRating", true)
        .expect("valid rule");
    rules
        .add("IfcWall", "Pset_WallCommon", "IsExternal", true)
        .expect("valid rule");

    c.bench_function("ids_validate_1000_walls", |b| {
        b.iter(|| validate(black_box(&model), black_box(rules.rules())))
    });
}

criterion_group!(benches, bench_extraction, bench_validation);
criterion_main!(benches);
