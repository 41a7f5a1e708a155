//! Script and feature lists

use crate::reader::{slice_at, FontReader};
use crate::tag::Tag;
use crate::Result;

const NO_REQUIRED_FEATURE: u16 = 0xFFFF;

/// Language system: which features apply
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LangSys {
    pub required_feature: Option<u16>,
    pub feature_indices: Vec<u16>,
}

impl LangSys {
    fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = FontReader::new(data);
        let _lookup_order = reader.read_u16()?;
        let required = reader.read_u16()?;
        let count = reader.read_u16()? as usize;
        Ok(Self {
            required_feature: (required != NO_REQUIRED_FEATURE).then_some(required),
            feature_indices: reader.read_u16_array(count)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Script {
    pub tag: Tag,
    pub default_lang_sys: Option<LangSys>,
    pub lang_sys: Vec<(Tag, LangSys)>,
}

impl Script {
    /// Language system for `language`, falling back to the default one
    pub fn lang_sys(&self, language: Option<Tag>) -> Option<&LangSys> {
        language
            .and_then(|lang| self.lang_sys.iter().find(|(tag, _)| *tag == lang))
            .map(|(_, sys)| sys)
            .or(self.default_lang_sys.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScriptList {
    pub scripts: Vec<Script>,
}

impl ScriptList {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = FontReader::new(data);
        let count = reader.read_u16()? as usize;
        let mut scripts = Vec::with_capacity(count);
        for _ in 0..count {
            let tag = reader.read_tag()?;
            let offset = reader.read_u16()? as usize;
            let script_data = slice_at(data, offset)?;

            let mut script_reader = FontReader::new(script_data);
            let default_offset = script_reader.read_u16()? as usize;
            let default_lang_sys = match default_offset {
                0 => None,
                off => Some(LangSys::parse(slice_at(script_data, off)?)?),
            };
            let lang_count = script_reader.read_u16()? as usize;
            let mut lang_sys = Vec::with_capacity(lang_count);
            for _ in 0..lang_count {
                let lang_tag = script_reader.read_tag()?;
                let lang_offset = script_reader.read_u16()? as usize;
                lang_sys.push((lang_tag, LangSys::parse(slice_at(script_data, lang_offset)?)?));
            }
            scripts.push(Script { tag, default_lang_sys, lang_sys });
        }
        Ok(Self { scripts })
    }

    pub fn find(&self, tag: Tag) -> Option<&Script> {
        self.scripts.iter().find(|s| s.tag == tag)
    }

    /// Requested script, else `DFLT`, else `latn`
    pub fn select(&self, tag: Tag) -> Option<&Script> {
        self.find(tag)
            .or_else(|| self.find(Tag::DFLT))
            .or_else(|| self.find(Tag::LATN))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRecord {
    pub tag: Tag,
    pub lookup_indices: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeatureList {
    pub features: Vec<FeatureRecord>,
}

impl FeatureList {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = FontReader::new(data);
        let count = reader.read_u16()? as usize;
        let mut features = Vec::with_capacity(count);
        for _ in 0..count {
            let tag = reader.read_tag()?;
            let offset = reader.read_u16()? as usize;
            let mut feature = FontReader::at(data, offset)?;
            let _params = feature.read_u16()?;
            let lookup_count = feature.read_u16()? as usize;
            features.push(FeatureRecord { tag, lookup_indices: feature.read_u16_array(lookup_count)? });
        }
        Ok(Self { features })
    }

    pub fn get(&self, index: u16) -> Option<&FeatureRecord> {
        self.features.get(index as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_list_with_default_lang_sys() {
        // ScriptList: 1 record 'latn' @ 8; Script: default @ 4, 0 langs;
        // LangSys: no required feature, features [0, 2]
        let data = [
            0, 1, b'l', b'a', b't', b'n', 0, 8,
            0, 4, 0, 0,
            0, 0, 0xFF, 0xFF, 0, 2, 0, 0, 0, 2,
        ];
        let list = ScriptList::parse(&data).unwrap();
        let script = list.select(Tag::new(b"arab")).unwrap();
        assert_eq!(script.tag, Tag::LATN);
        let lang_sys = script.lang_sys(Some(Tag::new(b"TRK "))).unwrap();
        assert_eq!(lang_sys.required_feature, None);
        assert_eq!(lang_sys.feature_indices, vec![0, 2]);
    }

    #[test]
    fn test_feature_list() {
        let data = [0, 1, b'k', b'e', b'r', b'n', 0, 8, 0, 0, 0, 2, 0, 4, 0, 1];
        let list = FeatureList::parse(&data).unwrap();
        assert_eq!(list.get(0).unwrap().tag, Tag::KERN);
        assert_eq!(list.get(0).unwrap().lookup_indices, vec![4, 1]);
        assert!(list.get(1).is_none());
    }
}
