// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for report composition in the kamera-document crate.
// Lays out a package of twenty sections with three photographed remarks each,
// the typical size of a full test package.

use std::io::Cursor;

use chrono::Utc;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use kamera_core::{FullLine, FullPackage, PdfLine, Project, Remark, TestPackage};
use kamera_document::{ReportAssets, ReportComposer};

fn sample_package() -> (FullPackage, ReportAssets) {
    let mut photo = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(320, 240, Rgb([90u8, 90, 90])))
        .write_to(&mut Cursor::new(&mut photo), ImageFormat::Png)
        .expect("encode photo");

    let mut assets = ReportAssets::new();
    let mut lines = Vec::new();
    let mut remark_id = 0;
    for section in 1..=20 {
        let mut remarks = Vec::new();
        for _ in 0..3 {
            remark_id += 1;
            assets.insert_image(remark_id, photo.clone());
            remarks.push(Remark {
                id: remark_id,
                pdf_line_id: section,
                image_path: format!("/uploads/remarks/{remark_id}.png"),
                comment: "Sprekk i rørvegg ved skjøt, anbefaler utbedring.".into(),
                created_at: Utc::now(),
            });
        }
        lines.push(FullLine {
            line: PdfLine {
                id: section,
                test_package_id: 1,
                name: format!("Line A-{section}"),
                pdf_path: None,
                line_number: section,
                created_at: Utc::now(),
            },
            remarks,
        });
    }

    let package = FullPackage {
        package: TestPackage {
            id: 1,
            project_id: 1,
            name: "TP-01".into(),
            comment: "Inspeksjon etter spyling.".into(),
            pipe_type: Some("PP".into()),
            lining: Some("Strømpe".into()),
            created_at: Utc::now(),
        },
        project: Some(Project {
            id: 1,
            project_number: "P-100".into(),
            customer_name: "Bygg AS".into(),
            created_at: Utc::now(),
        }),
        lines,
    };
    (package, assets)
}

fn bench_compose(c: &mut Criterion) {
    let (package, assets) = sample_package();

    c.bench_function("compose report (20 sections, 60 remarks)", |b| {
        b.iter(|| {
            let report = ReportComposer::new(black_box(&package), &assets).compose().expect("compose");
            black_box(report.bytes);
        });
    });
}

criterion_group!(benches, bench_compose);
criterion_main!(benches);
