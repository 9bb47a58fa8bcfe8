use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde_json::Value;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use hwpx_records::config::{EquationMode, ParseRules};
use hwpx_records::progress::ConsoleProgress;
use hwpx_records::records::{convert_hwpx, inspect_hwpx};

const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<hh:head xmlns:hh="http://www.hancom.co.kr/hwpml/2011/head">
  <hh:refList>
    <hh:charProperties itemCnt="3">
      <hh:charPr id="0"><hh:underline type="NONE"/></hh:charPr>
      <hh:charPr id="1"><hh:bold/><hh:underline type="NONE"/></hh:charPr>
      <hh:charPr id="2"><hh:subscript/></hh:charPr>
    </hh:charProperties>
    <hh:styles itemCnt="2">
      <hh:style id="0" type="PARA" name="바탕글" engName="Normal" paraPrIDRef="0" charPrIDRef="0" nextStyleIDRef="0" langID="1042" lockForm="0"/>
      <hh:style id="7" type="PARA" name="약효분류" engName="Category" paraPrIDRef="0" charPrIDRef="1" nextStyleIDRef="0" langID="1042" lockForm="0"/>
    </hh:styles>
  </hh:refList>
</hh:head>"#;

const MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<opf:package xmlns:opf="http://www.idpf.org/2007/opf/">
  <opf:manifest>
    <opf:item id="header" href="Contents/header.xml" media-type="application/xml"/>
    <opf:item id="section0" href="Contents/section0.xml" media-type="application/xml"/>
    <opf:item id="image1" href="BinData/image1.png" media-type="image/png" isEmbeded="1"/>
    <opf:item id="image2" href="BinData/image2.tif" media-type="image/tiff" isEmbeded="1"/>
  </opf:manifest>
</opf:package>"#;

fn para(style: &str, height: u32, runs: &str) -> String {
    format!(
        r#"<hp:p styleIDRef="{style}">{runs}<hp:linesegarray><hp:lineseg textpos="0" textheight="{height}"/></hp:linesegarray></hp:p>"#
    )
}

fn text_run(char_pr: &str, text: &str) -> String {
    format!(r#"<hp:run charPrIDRef="{char_pr}"><hp:t>{text}</hp:t></hp:run>"#)
}

fn section_xml(paragraphs: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<hs:sec xmlns:hs="http://www.hancom.co.kr/hwpml/2011/section" xmlns:hp="http://www.hancom.co.kr/hwpml/2011/paragraph" xmlns:hc="http://www.hancom.co.kr/hwpml/2011/core">{}</hs:sec>"#,
        paragraphs.concat()
    )
}

fn write_hwpx(path: &Path, section: &str) {
    let file = File::create(path).expect("create hwpx");
    let mut zout = ZipWriter::new(file);
    let files: [(&str, &[u8]); 6] = [
        ("mimetype", b"application/hwp+zip"),
        ("Contents/header.xml", HEADER.as_bytes()),
        ("Contents/content.hpf", MANIFEST.as_bytes()),
        ("Contents/section0.xml", section.as_bytes()),
        ("BinData/image1.png", b"\x89PNG\r\n"),
        ("BinData/image2.tif", b"II*\x00"),
    ];
    for (name, data) in files {
        zout.start_file(name, SimpleFileOptions::default())
            .expect("start file");
        zout.write_all(data).expect("write");
    }
    zout.finish().expect("finish");
}

fn read_json(path: &Path) -> Value {
    let bytes = std::fs::read(path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()));
    serde_json::from_slice(&bytes).expect("json")
}

fn rules() -> ParseRules {
    let mut rules = ParseRules::default();
    rules.metadata.chapter = Some("3".into());
    rules.metadata.section_style_id = Some("style-7".into());
    rules
}

#[test]
fn splits_handbook_into_records() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("handbook.hwpx");
    write_hwpx(
        &input,
        &section_xml(&[
            para("7", 1000, &text_run("1", "Antibiotics")),
            para("0", 1100, &text_run("1", "아목시실린")),
            para("0", 1000, &text_run("0", "Amoxicillin")),
            para("0", 1000, &text_run("0", "성인 1일 3회")),
            para("0", 1100, &text_run("1", "Aspirin")),
            para("0", 1000, &text_run("0", "아스피린")),
        ]),
    );

    let out = dir.path().join("out");
    let report =
        convert_hwpx(&input, &out, &rules(), &ConsoleProgress::silent()).expect("convert");
    assert!(report.is_success());
    assert_eq!(report.written.len(), 2);

    let meta = read_json(&out.join("아목시실린").join("metadata.json"));
    assert_eq!(meta["chapter"], "3");
    assert_eq!(meta["section"], "Antibiotics");
    assert_eq!(meta["title"], "아목시실린");
    assert_eq!(meta["subtitle"], "Amoxicillin");
    assert_eq!(meta["order"], 1);

    let data = read_json(&out.join("아목시실린").join("data.json"));
    let body = data["root"]["children"].as_array().expect("children");
    assert_eq!(body.len(), 1);
    assert_eq!(body[0]["type"], "paragraph");
    assert_eq!(body[0]["children"][0]["text"], "성인 1일 3회");
    assert_eq!(body[0]["children"][0]["format"], 0);

    let meta = read_json(&out.join("아스피린").join("metadata.json"));
    assert_eq!(meta["title"], "아스피린");
    assert_eq!(meta["subtitle"], "Aspirin");
    assert_eq!(meta["order"], 2);
    let data = read_json(&out.join("아스피린").join("data.json"));
    assert_eq!(data["root"]["children"].as_array().map(|a| a.len()), Some(0));
}

#[test]
fn images_and_equations_land_in_record() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("images.hwpx");
    let body = format!(
        "{}{}{}",
        text_run("2", "2"),
        r#"<hp:run charPrIDRef="0"><hp:pic><hc:img binaryItemIDRef="image1"/></hp:pic></hp:run>"#,
        r#"<hp:run charPrIDRef="0"><hp:pic><hc:img binaryItemIDRef="image2"/></hp:pic><hp:equation><hp:script>1 over 2</hp:script></hp:equation></hp:run>"#,
    );
    write_hwpx(
        &input,
        &section_xml(&[
            para("0", 1100, &text_run("1", "구조식 / 성분")),
            para("0", 1000, &text_run("0", "Formula")),
            para("0", 1000, &body),
        ]),
    );

    let out = dir.path().join("out");
    let mut rules = rules();
    rules.equations.mode = EquationMode::Latex;
    let report = convert_hwpx(&input, &out, &rules, &ConsoleProgress::silent()).expect("convert");
    assert_eq!(report.images, 2);

    let rec = out.join("구조식 _ 성분");
    assert_eq!(std::fs::read(rec.join("image1.png")).expect("png"), b"\x89PNG\r\n");
    assert!(rec.join("image2.tif").is_file());

    let data = read_json(&rec.join("data.json"));
    let children = data["root"]["children"][0]["children"]
        .as_array()
        .expect("children");
    assert_eq!(children.len(), 4);
    assert_eq!(children[0]["textStyle"], "sub");
    assert_eq!(children[0]["format"], 32);
    assert_eq!(children[1]["type"], "image");
    assert!(children[1]["src"]
        .as_str()
        .is_some_and(|s| s.starts_with("data:image/png;base64,")));
    assert_eq!(children[2]["type"], "image");
    assert!(children[2]["src"].is_null());
    assert_eq!(children[2]["savedPath"], "image2.tif");
    assert_eq!(children[3]["type"], "equation");
    assert_eq!(children[3]["equation"], r"\frac {1}{2}");
}

#[test]
fn inspect_lists_styles_and_records() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("inspect.hwpx");
    write_hwpx(
        &input,
        &section_xml(&[
            para("0", 1100, &text_run("0", "감기약")),
            para("0", 1000, &text_run("0", "ColdMed")),
        ]),
    );
    let summary = inspect_hwpx(&input, &ParseRules::default()).expect("inspect");
    assert_eq!(summary.sections, vec!["Contents/section0.xml"]);
    assert_eq!(summary.char_styles, 3);
    assert!(summary.para_styles.iter().any(|s| s.id == "7" && s.eng_name == "Category"));
    assert_eq!(summary.images.len(), 2);
    assert_eq!(summary.records.len(), 1);
    assert_eq!(summary.records[0].dir_name, "감기약");
    assert!(!dir.path().join("inspect_records").exists());
}

#[test]
fn archive_without_sections_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("empty.hwpx");
    let file = File::create(&input).expect("create");
    let mut zout = ZipWriter::new(file);
    zout.start_file("mimetype", SimpleFileOptions::default())
        .expect("start");
    zout.write_all(b"application/hwp+zip").expect("write");
    zout.finish().expect("finish");

    let err = convert_hwpx(
        &input,
        &dir.path().join("out"),
        &ParseRules::default(),
        &ConsoleProgress::silent(),
    )
    .unwrap_err();
    assert!(format!("{err:#}").contains("Contents/section*.xml"));
}
