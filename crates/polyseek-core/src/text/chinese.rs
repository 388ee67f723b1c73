//! Traditional / Simplified Chinese conversion
//!
//! Character-level conversion table covering the common Traditional (Hong
//! Kong) forms seen in ingested corpora. The table maps Traditional to
//! Simplified; the reverse map is derived by inversion, first entry winning
//! where several Traditional forms collapse to one Simplified character, so
//! the preferred Hong Kong form should be listed first.

use lazy_static::lazy_static;
use std::collections::HashMap;

/// Traditional -> Simplified pairs. Keys are Traditional-only glyphs; no
/// Simplified value appears as a key, which keeps conversion idempotent.
const PAIRS: &[(char, char)] = &[
    ('個', '个'), ('們', '们'), ('來', '来'), ('這', '这'), ('為', '为'),
    ('與', '与'), ('會', '会'), ('對', '对'), ('說', '说'), ('時', '时'),
    ('從', '从'), ('後', '后'), ('過', '过'), ('還', '还'), ('進', '进'),
    ('開', '开'), ('關', '关'), ('點', '点'), ('樣', '样'), ('當', '当'),
    ('現', '现'), ('經', '经'), ('讓', '让'), ('發', '发'), ('無', '无'),
    ('兩', '两'), ('萬', '万'), ('東', '东'), ('業', '业'), ('專', '专'),
    ('書', '书'), ('買', '买'), ('賣', '卖'), ('亂', '乱'), ('爭', '争'),
    ('雲', '云'), ('倉', '仓'), ('價', '价'), ('眾', '众'), ('優', '优'),
    ('傷', '伤'), ('偉', '伟'), ('傳', '传'), ('體', '体'), ('餘', '余'),
    ('僅', '仅'), ('預', '预'), ('顏', '颜'), ('額', '额'), ('風', '风'),
    ('飛', '飞'), ('飯', '饭'), ('飲', '饮'), ('養', '养'), ('館', '馆'),
    ('馬', '马'), ('駕', '驾'), ('騎', '骑'), ('驗', '验'), ('驚', '惊'),
    ('魚', '鱼'), ('鳥', '鸟'), ('鳴', '鸣'), ('麥', '麦'), ('黃', '黄'),
    ('黨', '党'), ('齊', '齐'), ('齒', '齿'), ('龍', '龙'), ('龜', '龟'),
    ('車', '车'), ('軌', '轨'), ('軍', '军'), ('輕', '轻'), ('載', '载'),
    ('輪', '轮'), ('轉', '转'), ('辦', '办'), ('辭', '辞'), ('農', '农'),
    ('運', '运'), ('連', '连'), ('遠', '远'), ('違', '违'), ('適', '适'),
    ('選', '选'), ('擇', '择'), ('郵', '邮'), ('醫', '医'), ('釋', '释'),
    ('裏', '里'), ('裡', '里'), ('針', '针'), ('銀', '银'), ('銅', '铜'),
    ('錢', '钱'), ('鋼', '钢'), ('錄', '录'), ('錯', '错'), ('鍵', '键'),
    ('鎖', '锁'), ('鎮', '镇'), ('鏡', '镜'), ('鐘', '钟'), ('鐵', '铁'),
    ('長', '长'), ('門', '门'), ('閉', '闭'), ('問', '问'), ('間', '间'),
    ('閱', '阅'), ('陽', '阳'), ('陰', '阴'), ('際', '际'), ('隨', '随'),
    ('隱', '隐'), ('雖', '虽'), ('雙', '双'), ('雜', '杂'), ('雞', '鸡'),
    ('離', '离'), ('難', '难'), ('電', '电'), ('靈', '灵'), ('靜', '静'),
    ('頁', '页'), ('頂', '顶'), ('項', '项'), ('順', '顺'), ('須', '须'),
    ('領', '领'), ('頭', '头'), ('題', '题'), ('類', '类'), ('顧', '顾'),
    ('愛', '爱'), ('戰', '战'), ('據', '据'), ('擊', '击'), ('擁', '拥'),
    ('擔', '担'), ('擴', '扩'), ('攝', '摄'), ('數', '数'), ('斷', '断'),
    ('舊', '旧'), ('曉', '晓'), ('條', '条'), ('極', '极'), ('構', '构'),
    ('標', '标'), ('樹', '树'), ('橋', '桥'), ('檢', '检'), ('歡', '欢'),
    ('歲', '岁'), ('歷', '历'), ('歸', '归'), ('殘', '残'), ('殺', '杀'),
    ('氣', '气'), ('漢', '汉'), ('滿', '满'), ('濟', '济'), ('濕', '湿'),
    ('灣', '湾'), ('燈', '灯'), ('燒', '烧'), ('牆', '墙'), ('獨', '独'),
    ('獻', '献'), ('環', '环'), ('產', '产'), ('畢', '毕'), ('畫', '画'),
    ('異', '异'), ('監', '监'), ('盡', '尽'), ('盤', '盘'), ('確', '确'),
    ('礦', '矿'), ('禮', '礼'), ('種', '种'), ('稱', '称'), ('積', '积'),
    ('穩', '稳'), ('窮', '穷'), ('競', '竞'), ('筆', '笔'), ('節', '节'),
    ('範', '范'), ('築', '筑'), ('簡', '简'), ('籌', '筹'), ('籃', '篮'),
    ('糧', '粮'), ('紅', '红'), ('紀', '纪'), ('約', '约'), ('紙', '纸'),
    ('級', '级'), ('組', '组'), ('細', '细'), ('終', '终'), ('給', '给'),
    ('絡', '络'), ('統', '统'), ('繼', '继'), ('續', '续'), ('維', '维'),
    ('綱', '纲'), ('網', '网'), ('緊', '紧'), ('線', '线'), ('練', '练'),
    ('縣', '县'), ('總', '总'), ('纖', '纤'), ('聽', '听'), ('聯', '联'),
    ('聲', '声'), ('職', '职'), ('腦', '脑'), ('臉', '脸'), ('膚', '肤'),
    ('臟', '脏'), ('興', '兴'), ('華', '华'), ('葉', '叶'), ('蘭', '兰'),
    ('處', '处'), ('號', '号'), ('蟲', '虫'), ('術', '术'), ('衛', '卫'),
    ('見', '见'), ('規', '规'), ('視', '视'), ('覺', '觉'), ('覽', '览'),
    ('觀', '观'), ('計', '计'), ('訂', '订'), ('認', '认'), ('訊', '讯'),
    ('記', '记'), ('許', '许'), ('設', '设'), ('訴', '诉'), ('詞', '词'),
    ('試', '试'), ('詩', '诗'), ('話', '话'), ('該', '该'), ('詳', '详'),
    ('語', '语'), ('誤', '误'), ('請', '请'), ('論', '论'), ('調', '调'),
    ('談', '谈'), ('謝', '谢'), ('證', '证'), ('識', '识'), ('譯', '译'),
    ('議', '议'), ('護', '护'), ('讀', '读'), ('變', '变'), ('貝', '贝'),
    ('負', '负'), ('財', '财'), ('貨', '货'), ('貴', '贵'), ('費', '费'),
    ('資', '资'), ('質', '质'), ('賽', '赛'), ('贏', '赢'), ('隊', '队'),
    ('階', '阶'), ('隻', '只'), ('機', '机'), ('學', '学'), ('幾', '几'),
    ('庫', '库'), ('應', '应'), ('張', '张'), ('彈', '弹'), ('強', '强'),
    ('廠', '厂'), ('廣', '广'), ('慶', '庆'), ('憶', '忆'), ('懷', '怀'),
    ('戶', '户'), ('熱', '热'), ('爺', '爷'), ('狀', '状'), ('獎', '奖'),
    ('絲', '丝'), ('習', '习'), ('樂', '乐'), ('鄉', '乡'), ('嚴', '严'),
    ('舉', '举'), ('義', '义'), ('烏', '乌'), ('麗', '丽'), ('臨', '临'),
    ('豐', '丰'), ('喪', '丧'), ('虧', '亏'),
];

lazy_static! {
    static ref TO_SIMPLIFIED: HashMap<char, char> = PAIRS.iter().copied().collect();
    static ref TO_TRADITIONAL: HashMap<char, char> = {
        let mut map = HashMap::new();
        for (traditional, simplified) in PAIRS.iter().copied() {
            map.entry(simplified).or_insert(traditional);
        }
        map
    };
}

/// Convert Traditional Chinese characters to Simplified
pub fn to_simplified(text: &str) -> String {
    text.chars()
        .map(|c| *TO_SIMPLIFIED.get(&c).unwrap_or(&c))
        .collect()
}

/// Convert Simplified Chinese characters back to Traditional (Hong Kong forms)
pub fn to_traditional_hk(text: &str) -> String {
    text.chars()
        .map(|c| *TO_TRADITIONAL.get(&c).unwrap_or(&c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn table_keys_are_unique() {
        let keys: HashSet<char> = PAIRS.iter().map(|(t, _)| *t).collect();
        assert_eq!(keys.len(), PAIRS.len());
    }

    #[test]
    fn simplified_values_are_never_keys() {
        // Conversion must be idempotent: no output character maps again.
        let keys: HashSet<char> = PAIRS.iter().map(|(t, _)| *t).collect();
        for (_, simplified) in PAIRS {
            assert!(!keys.contains(simplified), "{} is both key and value", simplified);
        }
    }

    #[test]
    fn round_trip_common_phrases() {
        assert_eq!(to_simplified("機器學習"), "机器学习");
        assert_eq!(to_traditional_hk("机器学习"), "機器學習");
        assert_eq!(to_simplified("簡體"), "简体");
    }

    #[test]
    fn non_chinese_text_is_untouched() {
        assert_eq!(to_simplified("plain ascii"), "plain ascii");
        assert_eq!(to_traditional_hk("plain ascii"), "plain ascii");
    }

    #[test]
    fn hk_form_wins_on_ambiguity() {
        // 里 inverts to the Hong Kong preferred 裏, not 裡.
        assert_eq!(to_traditional_hk("里"), "裏");
    }
}
