use std::collections::BTreeMap;

use crate::testutil::{self, file_nar, mini_drv, offset_of};
use crate::{list, Error, Header, Listing, ListingNode, Writer};

fn dir(entries: Vec<(&str, ListingNode)>) -> ListingNode {
    ListingNode::Directory {
        entries: entries
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect::<BTreeMap<_, _>>(),
    }
}

#[test]
fn single_file() {
    let data = file_nar(false, b"");
    let ls = list(&data[..]).unwrap();
    assert_eq!(
        ls.root,
        ListingNode::Regular {
            executable: false,
            size: 0,
            nar_offset: 96,
        }
    );
}

#[test]
fn tree() {
    let data = mini_drv();
    let ls = list(&data[..]).unwrap();

    let want = dir(vec![
        (
            "a.txt",
            ListingNode::Regular {
                executable: false,
                size: 4,
                nar_offset: offset_of(&data, b"AAA\n"),
            },
        ),
        (
            "bin",
            dir(vec![(
                "hello.sh",
                ListingNode::Regular {
                    executable: true,
                    size: testutil::HELLO_SCRIPT.len() as u64,
                    nar_offset: offset_of(&data, testutil::HELLO_SCRIPT),
                },
            )]),
        ),
        (
            "hello.txt",
            ListingNode::Regular {
                executable: false,
                size: 14,
                nar_offset: offset_of(&data, testutil::HELLO_WORLD),
            },
        ),
    ]);
    assert_eq!(ls.root, want);
}

#[test]
fn offsets_address_file_contents() {
    let data = mini_drv();
    let ls = list(&data[..]).unwrap();

    // every regular file's contents equal the archive slice its listing
    // node points at
    fn check(node: &ListingNode, data: &[u8], streamed: &BTreeMap<String, Vec<u8>>, path: String) {
        match node {
            ListingNode::Regular {
                size, nar_offset, ..
            } => {
                let got = &data[*nar_offset as usize..][..*size as usize];
                assert_eq!(got, streamed[&path], "{path:?}");
            }
            ListingNode::Directory { entries } => {
                for (name, child) in entries {
                    let child_path = if path.is_empty() {
                        name.clone()
                    } else {
                        format!("{path}/{name}")
                    };
                    check(child, data, streamed, child_path);
                }
            }
            ListingNode::Symlink { .. } => {}
        }
    }

    let mut streamed = BTreeMap::new();
    let mut r = crate::Reader::new(&data[..]);
    while let Some(hdr) = r.next().unwrap() {
        if hdr.kind == crate::NodeKind::Regular {
            let mut body = vec![];
            std::io::Read::read_to_end(&mut r, &mut body).unwrap();
            streamed.insert(hdr.path, body);
        }
    }
    check(&ls.root, &data, &streamed, String::new());
}

#[test]
fn locate() {
    let data = mini_drv();
    let ls = list(&data[..]).unwrap();

    assert!(ls.locate("").unwrap().is_dir());
    assert!(ls.locate(".").unwrap().is_dir());
    assert!(matches!(
        ls.locate("bin/hello.sh"),
        Some(ListingNode::Regular { .. })
    ));
    assert!(ls.locate("missing").is_none());
    assert!(ls.locate("a.txt/nested").is_none());
    assert!(ls.locate("..").is_none());
}

#[test]
fn non_utf8_symlink_target_not_listable() {
    let mut buf = vec![];
    let mut w = Writer::new(&mut buf);
    w.write_header(&Header::directory("")).unwrap();
    w.write_header(&Header::symlink("l", &b"\xff\xfe"[..])).unwrap();
    w.close().unwrap();
    drop(w);

    assert!(matches!(list(&buf[..]), Err(Error::InvalidData(_))));
}

const LISTING_JSON: &str = r#"
{
  "version": 1,
  "root": {
    "type": "directory",
    "entries": {
      "bin": {
        "type": "directory",
        "entries": {
          "curl": {
            "type": "regular",
            "size": 182520,
            "executable": true,
            "narOffset": 400
          }
        }
      },
      "sbin": {
        "type": "symlink",
        "target": "bin"
      }
    }
  }
}
"#;

fn curl_listing() -> Listing {
    Listing::new(dir(vec![
        (
            "bin",
            dir(vec![(
                "curl",
                ListingNode::Regular {
                    executable: true,
                    size: 182520,
                    nar_offset: 400,
                },
            )]),
        ),
        ("sbin", ListingNode::Symlink { target: "bin".into() }),
    ]))
}

#[test]
fn json_decode() {
    let ls: Listing = serde_json::from_str(LISTING_JSON).unwrap();
    assert_eq!(ls, curl_listing());
}

#[test]
fn json_roundtrip() {
    let encoded = serde_json::to_string(&curl_listing()).unwrap();
    let want: serde_json::Value = serde_json::from_str(LISTING_JSON).unwrap();
    let got: serde_json::Value = serde_json::from_str(&encoded).unwrap();
    assert_eq!(got, want);

    let back: Listing = serde_json::from_str(&encoded).unwrap();
    assert_eq!(back, curl_listing());
}

#[test]
fn executable_defaults_to_false() {
    let ls: Listing = serde_json::from_str(
        r#"{"version":1,"root":{"type":"regular","size":1,"narOffset":96}}"#,
    )
    .unwrap();
    assert_eq!(
        ls.root,
        ListingNode::Regular {
            executable: false,
            size: 1,
            nar_offset: 96,
        }
    );
}

#[test]
fn json_rejections() {
    for (json, why) in [
        (
            r#"{"version":2,"root":{"type":"directory","entries":{}}}"#,
            "unsupported version",
        ),
        (
            r#"{"root":{"type":"directory","entries":{}}}"#,
            "missing version",
        ),
        (r#"{"version":1}"#, "missing root"),
        (
            r#"{"version":1,"root":{"type":"directory","entries":{}},"extra":1}"#,
            "unknown top-level field",
        ),
        (
            r#"{"version":1,"root":{"type":"regular","size":1,"narOffset":0,"extra":true}}"#,
            "unknown node field",
        ),
        (
            r#"{"version":1,"root":{"type":"regular","narOffset":0}}"#,
            "missing size",
        ),
        (
            r#"{"version":1,"root":{"type":"regular","size":1}}"#,
            "missing narOffset",
        ),
        (
            r#"{"version":1,"root":{"type":"regular","size":1,"narOffset":0,"entries":{}}}"#,
            "entries on a regular file",
        ),
        (
            r#"{"version":1,"root":{"type":"directory","entries":{},"size":3}}"#,
            "size on a directory",
        ),
        (
            r#"{"version":1,"root":{"type":"directory"}}"#,
            "missing entries",
        ),
        (
            r#"{"version":1,"root":{"type":"symlink","target":""}}"#,
            "empty target",
        ),
        (
            r#"{"version":1,"root":{"type":"symlink"}}"#,
            "missing target",
        ),
        (
            r#"{"version":1,"root":{"type":"socket"}}"#,
            "unknown node type",
        ),
        (
            r#"{"version":1,"root":{"type":"directory","entries":{"a/b":{"type":"symlink","target":"x"}}}}"#,
            "slash in entry name",
        ),
        (
            r#"{"version":1,"root":{"type":"directory","entries":{"..":{"type":"symlink","target":"x"}}}}"#,
            "reserved entry name",
        ),
    ] {
        assert!(
            serde_json::from_str::<Listing>(json).is_err(),
            "must reject: {why}"
        );
    }
}
